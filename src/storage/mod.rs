// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use crate::extractors::chunk::split_into_parts;
use crate::extractors::types::{Document, ExtractionResult};
use crate::report::BatchReport;
use crate::utils::error::StorageError;

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding every file written for one document.
    pub fn document_dir(&self, document_id: &str) -> Result<PathBuf, StorageError> {
        let dir = self.base_dir.join(sanitize(document_id));
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Writes one text file per accepted section, `<slug>.txt`. With
    /// `max_part_words` set, long sections are written as `<slug>_partN.txt`.
    pub fn save_sections(
        &self,
        document: &Document,
        result: &ExtractionResult,
        max_part_words: Option<usize>,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let target_dir = self.document_dir(&document.id)?;
        let text = document.text();
        let mut written = Vec::new();

        for section in &result.sections {
            let slug = section.section_type.slug();
            let parts = match max_part_words {
                Some(limit) => split_into_parts(text, section, limit),
                None => Vec::new(),
            };

            if parts.len() > 1 {
                for part in &parts {
                    let file_path = target_dir.join(format!("{}_part{}.txt", slug, part.index + 1));
                    fs::write(&file_path, &text[part.start..part.end])?;
                    written.push(file_path);
                }
                tracing::debug!("Saved {} in {} parts", slug, parts.len());
            } else {
                let file_path = target_dir.join(format!("{}.txt", slug));
                fs::write(&file_path, section.text(text))?;
                written.push(file_path);
            }
        }

        tracing::info!("Saved {} section files to {}", written.len(), target_dir.display());
        Ok(written)
    }

    /// Saves the extraction result in JSON format, with a timestamp.
    pub fn save_result_metadata(&self, result: &ExtractionResult) -> Result<PathBuf, StorageError> {
        let file_path = self.document_dir(&result.document_id)?.join("extraction.json");

        let metadata = serde_json::json!({
            "document_id": result.document_id,
            "form_type": result.form_type,
            "total_words": result.total_words,
            "extracted_words": result.extracted_words(),
            "coverage": result.coverage,
            "coverage_suspicious": result.is_coverage_suspicious(),
            "sections": result.sections,
            "diagnostics": result.diagnostics,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });
        fs::write(&file_path, serde_json::to_string_pretty(&metadata)?)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }

    /// Writes `extraction_report.md` and `extraction_report.json` to the base directory.
    pub fn save_report(&self, report: &BatchReport) -> Result<(PathBuf, PathBuf), StorageError> {
        let markdown_path = self.base_dir.join("extraction_report.md");
        fs::write(&markdown_path, report.render_markdown())?;

        let json_path = self.base_dir.join("extraction_report.json");
        fs::write(&json_path, serde_json::to_string_pretty(report)?)?;

        tracing::info!("Saved extraction report to {}", markdown_path.display());
        Ok((markdown_path, json_path))
    }
}

/// Keeps document ids usable as directory names.
fn sanitize(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}
