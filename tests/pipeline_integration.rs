// tests/pipeline_integration.rs
// Local files through loading, batch extraction, storage and reporting

#[path = "integration/mod.rs"]
mod integration;

use std::fs;
use std::sync::Arc;

use filing_sections::batch::extract_all;
use filing_sections::input::{collect_paths, load_documents};
use filing_sections::report::{BatchReport, DocumentSummary, FileStatus};
use filing_sections::storage::StorageManager;
use filing_sections::{ExtractionConfig, FormType, SectionExtractor};
use integration::{quarterly_report, FilingFixture};

#[tokio::test]
async fn directory_of_filings_produces_sections_and_report() {
    let fixture = FilingFixture::new();
    fixture.write_filing("ACME_10-Q_2024-05-01.txt", &quarterly_report());
    fixture.write_filing("BETA_10-Q_2024-04-30.txt", "   ");
    fixture.write_filing("readme.md", "not a filing");

    let paths = collect_paths(&[fixture.root_path.clone()]).await.unwrap();
    assert_eq!(paths.len(), 2);
    let loaded = load_documents(&paths, None).await;
    assert!(loaded.failures.is_empty());
    assert!(loaded.documents.iter().all(|d| d.form_type == FormType::TenQ));

    let extractor = Arc::new(SectionExtractor::new(ExtractionConfig::default()).unwrap());
    let outcomes = extract_all(extractor, loaded.documents, 2).await;
    assert_eq!(outcomes.len(), 2);

    let storage = StorageManager::new(fixture.output_dir()).unwrap();
    let mut summaries = Vec::new();
    for outcome in &outcomes {
        match (&outcome.result, &outcome.document) {
            (Ok(result), Some(document)) => {
                let files = storage.save_sections(document, result, None).unwrap();
                assert_eq!(files.len(), result.sections.len());
                storage.save_result_metadata(result).unwrap();
                summaries.push(DocumentSummary::from_result(result));
            }
            (Err(e), _) => summaries.push(DocumentSummary::from_error(&outcome.document_id, Some(outcome.form_type), e)),
            (Ok(_), None) => unreachable!("successful outcomes keep their document"),
        }
    }

    let report = BatchReport::new(summaries);
    assert_eq!((report.passed, report.failed), (1, 1));
    assert_eq!(report.documents[0].status, FileStatus::Pass);
    storage.save_report(&report).unwrap();

    let acme_dir = fixture.output_dir().join("ACME_10-Q_2024-05-01");
    let mdna = fs::read_to_string(acme_dir.join("mdna.txt")).unwrap();
    assert!(mdna.starts_with("Item 2. Management's Discussion and Analysis"));
    assert!(acme_dir.join("extraction.json").exists());

    let markdown = fs::read_to_string(fixture.output_dir().join("extraction_report.md")).unwrap();
    assert!(markdown.contains("| PASS | ACME_10-Q_2024-05-01 | 10-Q | 6 |"));
    assert!(markdown.contains("| FAIL | BETA_10-Q_2024-04-30 | 10-Q | 0 | 0 | 0.0% |"));
}
