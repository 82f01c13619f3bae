// src/batch.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};

use crate::extractors::section::SectionExtractor;
use crate::extractors::types::{Document, ExtractionResult, FormType};
use crate::utils::error::ExtractError;

/// One document's extraction, as produced by a batch worker.
#[derive(Debug)]
pub struct BatchOutcome {
    pub document_id: String,
    pub form_type: FormType,
    /// `None` when the worker died and took the document with it.
    pub document: Option<Document>,
    pub result: Result<ExtractionResult, ExtractError>,
    pub elapsed: Duration,
}

/// Extracts many documents concurrently with at most `workers` in flight.
/// Outcomes are returned sorted by document id, whatever order they finished in.
pub async fn extract_all(extractor: Arc<SectionExtractor>, documents: Vec<Document>, workers: usize) -> Vec<BatchOutcome> {
    let total = documents.len();
    let workers = workers.max(1);
    let (tx, mut rx) = mpsc::channel(workers * 2);
    let semaphore = Arc::new(Semaphore::new(workers));

    tracing::info!("Extracting {} documents with {} workers", total, workers);

    for document in documents {
        let tx = tx.clone();
        let semaphore = semaphore.clone();
        let extractor = extractor.clone();

        tokio::spawn(async move {
            // Acquire semaphore permit
            let _permit = semaphore.acquire_owned().await;
            let start_time = Instant::now();
            let document_id = document.id.clone();
            let form_type = document.form_type;

            // Extraction is CPU-bound
            let joined = tokio::task::spawn_blocking(move || {
                let result = extractor.extract(&document);
                (document, result)
            })
            .await;

            let (document, result) = match joined {
                Ok((document, result)) => (Some(document), result),
                Err(join_error) => {
                    tracing::error!("Extraction worker for {} failed: {}", document_id, join_error);
                    (None, Err(ExtractError::Worker(join_error.to_string())))
                }
            };

            let _ = tx
                .send(BatchOutcome { document_id, form_type, document, result, elapsed: start_time.elapsed() })
                .await;
        });
    }
    drop(tx);

    let mut outcomes = Vec::with_capacity(total);
    while let Some(outcome) = rx.recv().await {
        tracing::debug!("{} finished in {:?}", outcome.document_id, outcome.elapsed);
        outcomes.push(outcome);
    }
    outcomes.sort_by(|a, b| a.document_id.cmp(&b.document_id));
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::config::ExtractionConfig;

    fn document(id: &str, text: &str) -> Document {
        Document::new(id, FormType::TenQ, text)
    }

    #[tokio::test]
    async fn test_outcomes_sorted_by_id() {
        let extractor = Arc::new(SectionExtractor::new(ExtractionConfig::default()).unwrap());
        let body = format!("Item 4. Controls and Procedures\n{}", "lorem ipsum dolor sit amet ".repeat(20));
        let documents = vec![document("c", &body), document("a", &body), document("b", "   ")];

        let outcomes = extract_all(extractor, documents, 2).await;
        let ids: Vec<&str> = outcomes.iter().map(|o| o.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(ExtractError::MalformedInput(_))));
    }

    #[test]
    fn test_zero_workers_still_runs() {
        let extractor = Arc::new(SectionExtractor::new(ExtractionConfig::default()).unwrap());
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let outcomes = runtime.block_on(extract_all(extractor, vec![document("only", "some words here")], 0));
        assert_eq!(outcomes.len(), 1);
    }

    #[test]
    fn test_empty_batch() {
        let extractor = Arc::new(SectionExtractor::new(ExtractionConfig::default()).unwrap());
        let outcomes = tokio_test::block_on(extract_all(extractor, Vec::new(), 4));
        assert!(outcomes.is_empty());
    }
}
