// src/input.rs
use std::path::{Path, PathBuf};

use crate::extractors::html::{html_to_text, looks_like_html};
use crate::extractors::types::{Document, FormType};
use crate::utils::error::{AppError, ExtractError};

const SUPPORTED_EXTENSIONS: [&str; 4] = ["txt", "htm", "html", "xhtml"];

/// A local file that could not be turned into a document.
#[derive(Debug)]
pub struct InputFailure {
    pub document_id: String,
    pub form_type: Option<FormType>,
    pub error: AppError,
}

#[derive(Debug, Default)]
pub struct LoadedInputs {
    pub documents: Vec<Document>,
    pub failures: Vec<InputFailure>,
}

/// Expands directories (one level, supported extensions only) and returns
/// the file list sorted for reproducible runs.
pub async fn collect_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, AppError> {
    let mut files = Vec::new();
    for input in inputs {
        let metadata = tokio::fs::metadata(input).await?;
        if metadata.is_dir() {
            let mut entries = tokio::fs::read_dir(input).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_file() && has_supported_extension(&path) {
                    files.push(path);
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    files.dedup();
    tracing::info!("Found {} input files", files.len());
    Ok(files)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(e)))
}

/// Reads every file; unreadable or undecodable files become failures
/// instead of aborting the batch.
pub async fn load_documents(paths: &[PathBuf], default_form: Option<FormType>) -> LoadedInputs {
    let mut loaded = LoadedInputs::default();
    for path in paths {
        let document_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let form_type = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(FormType::from_file_name)
            .or(default_form);

        match load_one(path, &document_id, form_type).await {
            Ok(document) => loaded.documents.push(document),
            Err(error) => {
                tracing::warn!("Skipping {}: {}", path.display(), error);
                loaded.failures.push(InputFailure { document_id, form_type, error: error.into() });
            }
        }
    }
    loaded
}

async fn load_one(path: &Path, document_id: &str, form_type: Option<FormType>) -> Result<Document, ExtractError> {
    let form_type = form_type.ok_or_else(|| {
        ExtractError::InvalidConfig(format!("Cannot infer the form type of {}; pass --form", path.display()))
    })?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExtractError::MalformedInput(format!("Cannot read {}: {}", path.display(), e)))?;

    let is_html_file = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("htm") || e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("xhtml"));
    document_from_bytes(document_id, form_type, bytes, is_html_file)
}

/// Decodes raw filing bytes, flattening HTML to text when needed.
pub fn document_from_bytes(
    document_id: &str,
    form_type: FormType,
    bytes: Vec<u8>,
    html_hint: bool,
) -> Result<Document, ExtractError> {
    let document = Document::from_bytes(document_id, form_type, bytes)?;
    if html_hint || looks_like_html(document.text()) {
        tracing::debug!("Converting {} from HTML", document_id);
        return Ok(Document::new(document_id, form_type, html_to_text(document.text())));
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collect_and_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ACME_10-Q_2024.txt"), "Item 2. Management's Discussion\nwords").unwrap();
        std::fs::write(dir.path().join("ACME_8-K_2024.htm"), "<html><body><p>Item 8.01 Other Events</p></body></html>").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        std::fs::write(dir.path().join("mystery.txt"), "no form in the name").unwrap();

        let paths = collect_paths(&[dir.path().to_path_buf()]).await.unwrap();
        assert_eq!(paths.len(), 3, "Unsupported extensions are skipped");

        let loaded = load_documents(&paths, None).await;
        assert_eq!(loaded.documents.len(), 2);
        let eight_k = loaded.documents.iter().find(|d| d.form_type == FormType::EightK).unwrap();
        assert_eq!(eight_k.text(), "Item 8.01 Other Events");
        assert_eq!(loaded.failures.len(), 1);
        assert_eq!(loaded.failures[0].document_id, "mystery");
        assert!(matches!(loaded.failures[0].error, AppError::Extraction(ExtractError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_default_form_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery.txt");
        std::fs::write(&path, "some text").unwrap();
        let loaded = load_documents(&[path], Some(FormType::TenK)).await;
        assert_eq!(loaded.documents[0].form_type, FormType::TenK);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = document_from_bytes("bin", FormType::TenQ, vec![0xff, 0x00, 0xfe], false).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedInput(_)));
    }
}
