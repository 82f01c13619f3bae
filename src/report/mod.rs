// src/report/mod.rs
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::extractors::types::{Diagnostic, ExtractionResult, FormType, SectionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pass,
    Warn,
    Fail,
}

impl FileStatus {
    fn label(&self) -> &'static str {
        match self {
            FileStatus::Pass => "PASS",
            FileStatus::Warn => "WARN",
            FileStatus::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionRow {
    pub section_type: SectionType,
    pub start: usize,
    pub end: usize,
    pub word_count: usize,
    pub confidence: f64,
}

/// Outcome of one document, ready for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub form_type: Option<FormType>,
    pub status: FileStatus,
    pub coverage_percent: f64,
    pub total_words: usize,
    pub extracted_words: usize,
    pub sections: Vec<SectionRow>,
    pub missing: Vec<SectionType>,
    pub conflicts: usize,
    pub issues: Vec<String>,
}

impl DocumentSummary {
    pub fn from_result(result: &ExtractionResult) -> Self {
        let mut issues = Vec::new();
        for (section, reason) in result.rejected() {
            issues.push(format!("{} rejected: {} ({} words)", section.section_type, reason, section.word_count));
        }
        for (section_type, warning) in result.warnings() {
            issues.push(format!("{}: {}", section_type, warning));
        }
        if result.is_coverage_suspicious() {
            issues.push(format!("Coverage {:.1}% is suspiciously high", result.coverage * 100.0));
        }
        let conflicts = result
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::BoundaryConflict { .. } | Diagnostic::OverlapDropped { .. }))
            .count();

        let status = if result.sections.is_empty() {
            issues.push("No sections extracted".to_string());
            FileStatus::Fail
        } else if issues.is_empty() {
            FileStatus::Pass
        } else {
            FileStatus::Warn
        };

        Self {
            document_id: result.document_id.clone(),
            form_type: Some(result.form_type),
            status,
            coverage_percent: result.coverage * 100.0,
            total_words: result.total_words,
            extracted_words: result.extracted_words(),
            sections: result
                .sections
                .iter()
                .map(|s| SectionRow {
                    section_type: s.section_type,
                    start: s.start,
                    end: s.end,
                    word_count: s.word_count,
                    confidence: s.confidence,
                })
                .collect(),
            missing: result.absent_sections(),
            conflicts,
            issues,
        }
    }

    /// A document that could not be extracted at all.
    pub fn from_error(document_id: &str, form_type: Option<FormType>, error: &dyn std::error::Error) -> Self {
        Self {
            document_id: document_id.to_string(),
            form_type,
            status: FileStatus::Fail,
            coverage_percent: 0.0,
            total_words: 0,
            extracted_words: 0,
            sections: Vec::new(),
            missing: Vec::new(),
            conflicts: 0,
            issues: vec![error.to_string()],
        }
    }
}

/// Cross-document statistics for a batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub generated_at: String,
    pub documents: Vec<DocumentSummary>,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub section_frequency: BTreeMap<SectionType, usize>,
    pub average_coverage_percent: f64,
    pub total_words: usize,
    pub extracted_words: usize,
}

impl BatchReport {
    pub fn new(documents: Vec<DocumentSummary>) -> Self {
        let count = |status: FileStatus| documents.iter().filter(|d| d.status == status).count();
        let (passed, warned, failed) = (count(FileStatus::Pass), count(FileStatus::Warn), count(FileStatus::Fail));

        let mut section_frequency = BTreeMap::new();
        for row in documents.iter().flat_map(|d| &d.sections) {
            *section_frequency.entry(row.section_type).or_insert(0) += 1;
        }

        // Failed documents never had a coverage to average
        let extracted: Vec<&DocumentSummary> = documents.iter().filter(|d| d.total_words > 0).collect();
        let average_coverage_percent = if extracted.is_empty() {
            0.0
        } else {
            extracted.iter().map(|d| d.coverage_percent).sum::<f64>() / extracted.len() as f64
        };

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            passed,
            warned,
            failed,
            section_frequency,
            average_coverage_percent,
            total_words: documents.iter().map(|d| d.total_words).sum(),
            extracted_words: documents.iter().map(|d| d.extracted_words).sum(),
            documents,
        }
    }

    pub fn render_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Section Extraction Report\n");
        let _ = writeln!(md, "Generated: {}\n", self.generated_at);

        let _ = writeln!(md, "## Summary\n");
        let _ = writeln!(md, "- Documents: {}", self.documents.len());
        let _ = writeln!(md, "- Passed: {}/{}", self.passed, self.documents.len());
        let _ = writeln!(md, "- Warnings: {}", self.warned);
        let _ = writeln!(md, "- Failed: {}", self.failed);
        let _ = writeln!(md, "- Average coverage: {:.1}%", self.average_coverage_percent);
        let _ = writeln!(md, "- Words extracted: {} of {}\n", self.extracted_words, self.total_words);

        if !self.section_frequency.is_empty() {
            let _ = writeln!(md, "## Sections Found\n");
            let _ = writeln!(md, "| Section | Documents |");
            let _ = writeln!(md, "|---|---|");
            for (section_type, count) in &self.section_frequency {
                let _ = writeln!(md, "| {} | {} |", section_type, count);
            }
            let _ = writeln!(md);
        }

        let _ = writeln!(md, "## Documents\n");
        let _ = writeln!(md, "| Status | Document | Form | Sections | Words | Coverage |");
        let _ = writeln!(md, "|---|---|---|---|---|---|");
        for doc in &self.documents {
            let form = doc.form_type.map(|f| f.as_str()).unwrap_or("-");
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {:.1}% |",
                doc.status.label(),
                doc.document_id,
                form,
                doc.sections.len(),
                doc.total_words,
                doc.coverage_percent
            );
        }

        for doc in &self.documents {
            let _ = writeln!(md, "\n### {} ({})\n", doc.document_id, doc.status.label());
            if !doc.sections.is_empty() {
                let _ = writeln!(md, "| Section | Span | Words | Confidence |");
                let _ = writeln!(md, "|---|---|---|---|");
                for row in &doc.sections {
                    let _ = writeln!(
                        md,
                        "| {} | {}..{} | {} | {:.2} |",
                        row.section_type, row.start, row.end, row.word_count, row.confidence
                    );
                }
            }
            if !doc.missing.is_empty() {
                let names: Vec<&str> = doc.missing.iter().map(|s| s.title()).collect();
                let _ = writeln!(md, "\nMissing: {}", names.join(", "));
            }
            if doc.conflicts > 0 {
                let _ = writeln!(md, "\nBoundary conflicts resolved: {}", doc.conflicts);
            }
            for issue in &doc.issues {
                let _ = writeln!(md, "- {}", issue);
            }
        }
        md
    }
}
