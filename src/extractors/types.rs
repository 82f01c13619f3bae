// src/extractors/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::ExtractError;

/// Coverage above this ratio means the extractor claimed front/back matter too.
pub const SUSPICIOUS_COVERAGE: f64 = 0.95;

// --- Form Types ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormType {
    #[serde(rename = "10-K")]
    TenK,
    #[serde(rename = "10-Q")]
    TenQ,
    #[serde(rename = "8-K")]
    EightK,
}

impl FormType {
    pub const ALL: [FormType; 3] = [FormType::TenK, FormType::TenQ, FormType::EightK];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::TenK => "10-K",
            FormType::TenQ => "10-Q",
            FormType::EightK => "8-K",
        }
    }

    /// Guesses the form from a file name such as `NVDA_10-Q_2024-05-29.txt`.
    pub fn from_file_name(name: &str) -> Option<FormType> {
        let upper = name.to_uppercase().replace('_', "-");
        if upper.contains("10-Q") || upper.contains("10Q") {
            Some(FormType::TenQ)
        } else if upper.contains("10-K") || upper.contains("10K") {
            Some(FormType::TenK)
        } else if upper.contains("8-K") || upper.contains("8K") {
            Some(FormType::EightK)
        } else {
            None
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        // Amendments are extracted like their base form
        let base = normalized.strip_suffix("/A").unwrap_or(&normalized);
        match base {
            "10-K" | "10K" => Ok(FormType::TenK),
            "10-Q" | "10Q" => Ok(FormType::TenQ),
            "8-K" | "8K" => Ok(FormType::EightK),
            _ => Err(ExtractError::InvalidConfig(format!("Unknown form type '{}'", s))),
        }
    }
}

// --- Section Vocabulary ---
/// Declaration order is the default canonical document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Business,
    RiskFactors,
    LegalProceedings,
    ManagementDiscussion,
    MarketRisk,
    FinancialStatements,
    ControlsAndProcedures,
    OtherInformation,
    ResultsOfOperations,
    RegulationFd,
    OtherEvents,
    FinancialStatementsAndExhibits,
}

impl SectionType {
    pub const ALL: [SectionType; 12] = [
        SectionType::Business,
        SectionType::RiskFactors,
        SectionType::LegalProceedings,
        SectionType::ManagementDiscussion,
        SectionType::MarketRisk,
        SectionType::FinancialStatements,
        SectionType::ControlsAndProcedures,
        SectionType::OtherInformation,
        SectionType::ResultsOfOperations,
        SectionType::RegulationFd,
        SectionType::OtherEvents,
        SectionType::FinancialStatementsAndExhibits,
    ];

    /// Human readable title, used in reports.
    pub fn title(&self) -> &'static str {
        match self {
            SectionType::Business => "Business",
            SectionType::RiskFactors => "Risk Factors",
            SectionType::LegalProceedings => "Legal Proceedings",
            SectionType::ManagementDiscussion => "Management's Discussion & Analysis",
            SectionType::MarketRisk => "Quantitative and Qualitative Disclosures About Market Risk",
            SectionType::FinancialStatements => "Financial Statements",
            SectionType::ControlsAndProcedures => "Controls and Procedures",
            SectionType::OtherInformation => "Other Information",
            SectionType::ResultsOfOperations => "Results of Operations and Financial Condition",
            SectionType::RegulationFd => "Regulation FD Disclosure",
            SectionType::OtherEvents => "Other Events",
            SectionType::FinancialStatementsAndExhibits => "Financial Statements and Exhibits",
        }
    }

    /// Short identifier used for file names.
    pub fn slug(&self) -> &'static str {
        match self {
            SectionType::Business => "business",
            SectionType::RiskFactors => "risk_factors",
            SectionType::LegalProceedings => "legal_proceedings",
            SectionType::ManagementDiscussion => "mdna",
            SectionType::MarketRisk => "market_risk",
            SectionType::FinancialStatements => "financial_statements",
            SectionType::ControlsAndProcedures => "controls_and_procedures",
            SectionType::OtherInformation => "other_information",
            SectionType::ResultsOfOperations => "results_of_operations",
            SectionType::RegulationFd => "regulation_fd",
            SectionType::OtherEvents => "other_events",
            SectionType::FinancialStatementsAndExhibits => "financial_statements_and_exhibits",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// --- Input Document ---
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub form_type: FormType,
    text: String,
    word_count: usize,
}

impl Document {
    pub fn new(id: impl Into<String>, form_type: FormType, text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = count_words(&text);
        Self { id: id.into(), form_type, text, word_count }
    }

    /// Builds a document from raw bytes, rejecting anything that is not UTF-8 text.
    pub fn from_bytes(id: impl Into<String>, form_type: FormType, bytes: Vec<u8>) -> Result<Self, ExtractError> {
        let id = id.into();
        let text = String::from_utf8(bytes)
            .map_err(|e| ExtractError::MalformedInput(format!("{} is not valid UTF-8: {}", id, e)))?;
        Ok(Self::new(id, form_type, text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

// --- Candidates ---
/// Where a heading match sits relative to its surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchContext {
    /// Starts its own line.
    Heading,
    /// Mid-line, with no reference wording around it.
    Inline,
    /// Parenthetical, quoted, or introduced by "see", "refer to", ...
    CrossReference,
    /// Line ends in a page number or dot leaders.
    TableOfContents,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub section_type: SectionType,
    pub offset: usize,
    pub matched: String,
    pub confidence: f64,
    pub context: MatchContext,
}

impl Candidate {
    /// End of the matched heading text.
    pub fn heading_end(&self) -> usize {
        self.offset + self.matched.len()
    }
}

// --- Output ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub section_type: SectionType,
    pub start: usize,
    pub end: usize,
    pub word_count: usize,
    pub confidence: f64,
    pub heading: String,
}

impl Section {
    /// Slices the section body out of the document text it was extracted from.
    pub fn text<'a>(&self, document_text: &'a str) -> &'a str {
        document_text.get(self.start..self.end).unwrap_or("")
    }

    pub fn overlaps(&self, other: &Section) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TooShort,
    BoundaryInverted,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::TooShort => f.write_str("too short"),
            RejectReason::BoundaryInverted => f.write_str("boundary inverted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityWarning {
    SuspiciousAllCaps,
    Boilerplate,
}

impl fmt::Display for QualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityWarning::SuspiciousAllCaps => f.write_str("mostly upper-case text"),
            QualityWarning::Boilerplate => f.write_str("mostly legal boilerplate"),
        }
    }
}

/// How a boundary conflict between two sections was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// The named section moved to its next-best candidate.
    Reranked { section_type: SectionType, offset: usize },
    /// The named section was dropped.
    Dropped { section_type: SectionType },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    SectionAbsent {
        section_type: SectionType,
    },
    BoundaryConflict {
        /// Section appearing first in the document.
        leading: SectionType,
        /// Section appearing next although it belongs before `leading`.
        following: SectionType,
        resolution: ConflictResolution,
    },
    OverlapTruncated {
        section_type: SectionType,
        previous_end: usize,
        new_end: usize,
    },
    OverlapDropped {
        section_type: SectionType,
        kept: SectionType,
    },
    Rejected {
        section: Section,
        reason: RejectReason,
    },
    Warning {
        section_type: SectionType,
        warning: QualityWarning,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: String,
    pub form_type: FormType,
    pub total_words: usize,
    /// Accepted sections, sorted by start offset.
    pub sections: Vec<Section>,
    pub diagnostics: Vec<Diagnostic>,
    pub coverage: f64,
}

impl ExtractionResult {
    pub fn section(&self, section_type: SectionType) -> Option<&Section> {
        self.sections.iter().find(|s| s.section_type == section_type)
    }

    pub fn extracted_words(&self) -> usize {
        self.sections.iter().map(|s| s.word_count).sum()
    }

    pub fn is_coverage_suspicious(&self) -> bool {
        self.coverage > SUSPICIOUS_COVERAGE
    }

    pub fn absent_sections(&self) -> Vec<SectionType> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::SectionAbsent { section_type } => Some(*section_type),
                _ => None,
            })
            .collect()
    }

    pub fn rejected(&self) -> impl Iterator<Item = (&Section, RejectReason)> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::Rejected { section, reason } => Some((section, *reason)),
            _ => None,
        })
    }

    pub fn warnings(&self) -> impl Iterator<Item = (SectionType, QualityWarning)> + '_ {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::Warning { section_type, warning } => Some((*section_type, *warning)),
            _ => None,
        })
    }
}

pub fn coverage_ratio(extracted_words: usize, total_words: usize) -> f64 {
    if total_words == 0 {
        return 0.0;
    }
    (extracted_words as f64 / total_words as f64).min(1.0)
}
