// src/main.rs
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use filing_sections::batch;
use filing_sections::edgar::client;
use filing_sections::extractors::{ExtractionConfig, FormType, SectionExtractor};
use filing_sections::input::{self, InputFailure, LoadedInputs};
use filing_sections::report::{BatchReport, DocumentSummary};
use filing_sections::storage::StorageManager;
use filing_sections::utils::{self, AppError};

/// Extracts named sections (MD&A, Risk Factors, Controls and Procedures, ...)
/// from SEC 10-K, 10-Q and 8-K filings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local filing files or directories (.txt, .htm, .html)
    #[arg(short, long, num_args = 1.., conflicts_with = "ticker")]
    input: Vec<PathBuf>,

    /// Ticker symbol of the company; filings are downloaded from EDGAR
    #[arg(short, long)]
    ticker: Option<String>,

    /// Form type (10-K, 10-Q, 8-K). Required with --ticker; default for local files whose name does not say
    #[arg(short, long)]
    form: Option<FormType>,

    /// First filing year to download (optional)
    #[arg(long)]
    start_year: Option<u32>,

    /// Last filing year to download (optional)
    #[arg(long)]
    end_year: Option<u32>,

    /// Maximum number of filings to download, newest first
    #[arg(long)]
    limit: Option<usize>,

    /// Output directory for extracted content
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// JSON extraction config; command-line thresholds override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum words for a section to be kept
    #[arg(long)]
    min_words: Option<usize>,

    /// Minimum heading confidence (0.0 - 1.0)
    #[arg(long)]
    confidence_threshold: Option<f64>,

    /// Number of documents extracted concurrently
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Split sections longer than this many words into part files
    #[arg(long)]
    max_part_words: Option<usize>,

    /// Debug mode - verbose logs and annotated HTML files
    #[arg(short, long)]
    debug: bool,
}

fn build_config(args: &Args) -> Result<ExtractionConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => ExtractionConfig::from_json_file(path)?,
        None => ExtractionConfig::default(),
    };
    if let Some(min_words) = args.min_words {
        config.min_word_threshold = min_words;
    }
    if let Some(threshold) = args.confidence_threshold {
        config.confidence_threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

/// Downloads filings from EDGAR and turns them into documents.
async fn download_documents(args: &Args, ticker: &str) -> Result<LoadedInputs, AppError> {
    let form_type = args
        .form
        .ok_or_else(|| AppError::Config("--form is required with --ticker".to_string()))?;

    let mut filings = client::find_filings(ticker, form_type, args.start_year, args.end_year).await?;
    if let Some(limit) = args.limit {
        filings.truncate(limit);
    }
    if filings.is_empty() {
        return Err(AppError::Config(format!(
            "No {} filings found for ticker {} in the specified date range",
            form_type, ticker
        )));
    }

    let mut loaded = LoadedInputs::default();
    for filing in filings {
        let document_id = filing.document_id();
        let url = filing.primary_doc_url();
        let result = match client::download_filing_doc(&url).await {
            Ok(content) => {
                let is_html = filing.primary_doc.to_lowercase().ends_with(".htm")
                    || filing.primary_doc.to_lowercase().ends_with(".html");
                input::document_from_bytes(&document_id, form_type, content.into_bytes(), is_html).map_err(AppError::from)
            }
            Err(e) => Err(AppError::from(e)),
        };
        match result {
            Ok(document) => loaded.documents.push(document),
            Err(error) => {
                tracing::error!("Failed to load {}: {}", document_id, error);
                loaded.failures.push(InputFailure { document_id, form_type: Some(form_type), error });
            }
        }
    }
    Ok(loaded)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments, then setup logging (reads RUST_LOG env var)
    let args = Args::parse();
    utils::logging::setup_logging(args.debug);
    tracing::info!("Starting processing for args: {:?}", args);

    // 2. Configuration and extractor
    let config = build_config(&args)?;
    let extractor = Arc::new(SectionExtractor::new(config)?);
    let storage = StorageManager::new(&args.output_dir)?;

    // 3. Acquire documents
    let loaded = match &args.ticker {
        Some(ticker) => download_documents(&args, ticker).await?,
        None if !args.input.is_empty() => {
            let paths = input::collect_paths(&args.input).await?;
            input::load_documents(&paths, args.form).await
        }
        None => return Err(AppError::Config("Pass --input paths or a --ticker".to_string())),
    };
    let LoadedInputs { documents, failures } = loaded;
    tracing::info!("Loaded {} documents ({} failed to load)", documents.len(), failures.len());

    // 4. Extract
    let outcomes = batch::extract_all(extractor.clone(), documents, args.workers).await;

    // 5. Save sections, metadata and debug output
    let mut summaries = Vec::with_capacity(outcomes.len() + failures.len());
    for outcome in outcomes {
        match (&outcome.result, &outcome.document) {
            (Ok(result), Some(document)) => {
                if let Err(e) = storage.save_sections(document, result, args.max_part_words) {
                    tracing::error!("Failed to save sections of {}: {}", document.id, e);
                }
                if let Err(e) = storage.save_result_metadata(result) {
                    tracing::error!("Failed to save metadata of {}: {}", document.id, e);
                }
                if args.debug {
                    let annotated = storage.document_dir(&document.id)?.join("annotated.html");
                    let candidates = extractor.candidates(document);
                    if let Err(e) = utils::html_debug::save_debug_html(&annotated, document.text(), &candidates, result) {
                        tracing::warn!("Failed to create debug HTML: {}", e);
                    }
                }
                summaries.push(DocumentSummary::from_result(result));
            }
            (Ok(result), None) => summaries.push(DocumentSummary::from_result(result)),
            (Err(e), _) => {
                tracing::error!("Failed to extract {}: {}", outcome.document_id, e);
                summaries.push(DocumentSummary::from_error(&outcome.document_id, Some(outcome.form_type), e));
            }
        }
    }
    for failure in &failures {
        summaries.push(DocumentSummary::from_error(&failure.document_id, failure.form_type, &failure.error));
    }
    summaries.sort_by(|a, b| a.document_id.cmp(&b.document_id));

    // 6. Report
    let report = BatchReport::new(summaries);
    storage.save_report(&report)?;
    tracing::info!(
        "Processing finished. Passed: {}, Warnings: {}, Failed: {}, average coverage {:.1}%",
        report.passed,
        report.warned,
        report.failed,
        report.average_coverage_percent
    );

    if !report.documents.is_empty() && report.passed + report.warned == 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract any sections from {} documents",
            report.documents.len()
        )));
    }

    Ok(())
}
