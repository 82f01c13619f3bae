// src/extractors/patterns.rs
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::extractors::config::CustomPattern;
use crate::extractors::types::SectionType;
use crate::utils::error::ExtractError;

// "Item 7.", "Item 1A -", "ITEM 2.02", "Item 1A,"
const ITEM_PREFIX: &str = r"(?P<num>Item\s*\d{1,2}[A-Z]?(?:\.\d{2})?\s*[\.:,\-–—]*\s*)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// The official item title.
    Full,
    /// Abbreviation or shortened title.
    Synonym,
}

impl PatternKind {
    pub fn base_score(&self) -> f64 {
        match self {
            PatternKind::Full => 1.0,
            PatternKind::Synonym => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingPolicy {
    #[default]
    Optional,
    /// Only match after an "Item N." prefix; the bare phrase is too common.
    Required,
}

/// A phrase template with its tolerance policy, before compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingPattern {
    pub phrase: String,
    pub kind: PatternKind,
    pub numbering: NumberingPolicy,
}

impl HeadingPattern {
    pub fn new(phrase: &str, kind: PatternKind, numbering: NumberingPolicy) -> Self {
        Self { phrase: phrase.to_string(), kind, numbering }
    }
}

#[derive(Debug)]
pub struct CompiledPattern {
    pub section_type: SectionType,
    pub pattern: HeadingPattern,
    /// Matches the whole heading; the item prefix, when present, is group `num`.
    pub regex: Regex,
}

/// Immutable heading vocabulary handed to the matcher.
#[derive(Debug)]
pub struct PatternTable {
    compiled: BTreeMap<SectionType, Vec<CompiledPattern>>,
}

impl PatternTable {
    /// The built-in vocabulary for 10-K, 10-Q and 8-K items.
    pub fn standard() -> Result<Self, ExtractError> {
        Self::with_custom(&[])
    }

    pub fn with_custom(custom: &[CustomPattern]) -> Result<Self, ExtractError> {
        let mut table = PatternTable { compiled: BTreeMap::new() };
        for (section_type, pattern) in standard_patterns() {
            table.add(section_type, pattern)?;
        }
        for extra in custom {
            table.add(extra.section_type, HeadingPattern::new(&extra.phrase, extra.kind, extra.numbering))?;
        }
        Ok(table)
    }

    fn add(&mut self, section_type: SectionType, pattern: HeadingPattern) -> Result<(), ExtractError> {
        let regex = Regex::new(&pattern_source(&pattern)).map_err(|e| ExtractError::InvalidPattern {
            pattern: pattern.phrase.clone(),
            source: e,
        })?;
        self.compiled
            .entry(section_type)
            .or_default()
            .push(CompiledPattern { section_type, pattern, regex });
        Ok(())
    }

    pub fn patterns_for(&self, section_type: SectionType) -> &[CompiledPattern] {
        self.compiled.get(&section_type).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn standard_patterns() -> Vec<(SectionType, HeadingPattern)> {
    use NumberingPolicy::*;
    use PatternKind::*;
    use SectionType::*;

    [
        (Business, "Business", Full, Required),
        (RiskFactors, "Risk Factors", Full, Optional),
        (LegalProceedings, "Legal Proceedings", Full, Optional),
        (ManagementDiscussion, "Management's Discussion and Analysis", Full, Optional),
        (ManagementDiscussion, "Management's Discussion", Synonym, Optional),
        (ManagementDiscussion, "MD&A", Synonym, Optional),
        (MarketRisk, "Quantitative and Qualitative Disclosures About Market Risk", Full, Optional),
        (MarketRisk, "Quantitative and Qualitative Disclosure", Synonym, Optional),
        (FinancialStatements, "Financial Statements and Supplementary Data", Full, Optional),
        (FinancialStatements, "Financial Statements", Synonym, Required),
        (ControlsAndProcedures, "Controls and Procedures", Full, Optional),
        (OtherInformation, "Other Information", Full, Optional),
        (ResultsOfOperations, "Results of Operations and Financial Condition", Full, Optional),
        (RegulationFd, "Regulation FD Disclosure", Full, Optional),
        (OtherEvents, "Other Events", Full, Optional),
        (FinancialStatementsAndExhibits, "Financial Statements and Exhibits", Full, Optional),
    ]
    .into_iter()
    .map(|(section_type, phrase, kind, numbering)| (section_type, HeadingPattern::new(phrase, kind, numbering)))
    .collect()
}

/// Turns a phrase into a tolerant regex body: any whitespace between words,
/// optional or curly apostrophes, "and" interchangeable with "&".
pub fn phrase_regex(phrase: &str) -> String {
    let words: Vec<String> = phrase
        .split_whitespace()
        .map(|word| {
            if word.eq_ignore_ascii_case("and") || word == "&" {
                return r"(?:and|&)".to_string();
            }
            word.chars()
                .map(|c| match c {
                    '\'' | '’' => r"['’]?".to_string(),
                    _ => regex::escape(&c.to_string()),
                })
                .collect()
        })
        .collect();

    let mut body = words.join(r"\s+");
    if phrase.chars().last().is_some_and(|c| c.is_alphanumeric()) {
        body.push_str(r"\b");
    }
    body
}

fn pattern_source(pattern: &HeadingPattern) -> String {
    let numbering = match pattern.numbering {
        NumberingPolicy::Optional => format!("{}?", ITEM_PREFIX),
        NumberingPolicy::Required => ITEM_PREFIX.to_string(),
    };
    format!(r"(?i)\b{}{}", numbering, phrase_regex(&pattern.phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(section_type: SectionType) -> Vec<Regex> {
        let table = PatternTable::standard().expect("standard table compiles");
        table.patterns_for(section_type).iter().map(|p| p.regex.clone()).collect()
    }

    #[test]
    fn test_phrase_tolerates_whitespace_case_and_apostrophes() {
        let re = Regex::new(&format!("(?i){}", phrase_regex("Management's Discussion and Analysis"))).unwrap();
        assert!(re.is_match("MANAGEMENT’S   DISCUSSION\nAND ANALYSIS"));
        assert!(re.is_match("Managements Discussion & Analysis"));
        assert!(!re.is_match("Management Discussion of Analysis"));
    }

    #[test]
    fn test_pattern_captures_heading_and_number() {
        let patterns = compiled(SectionType::RiskFactors);
        let text = "intro\n   Item 1A. Risk Factors\nbody";
        let caps = patterns[0].captures(text).expect("heading matches");
        let whole = caps.get(0).unwrap();
        assert_eq!(whole.as_str(), "Item 1A. Risk Factors");
        assert_eq!(whole.start(), text.find("Item").unwrap());
        assert!(caps.name("num").is_some());
    }

    #[test]
    fn test_unnumbered_mention_has_no_prefix() {
        let patterns = compiled(SectionType::RiskFactors);
        let caps = patterns[0].captures("as described under Risk Factors below").unwrap();
        assert_eq!(caps.get(0).unwrap().as_str(), "Risk Factors");
        assert!(caps.name("num").is_none());
    }

    #[test]
    fn test_required_numbering() {
        let patterns = compiled(SectionType::Business);
        assert!(patterns[0].is_match("Item 1. Business"));
        assert!(!patterns[0].is_match("Business"), "Bare 'Business' is too common to be a heading");
    }

    #[test]
    fn test_eight_k_item_numbers() {
        let patterns = compiled(SectionType::ResultsOfOperations);
        let caps = patterns[0].captures("Item 2.02 Results of Operations and Financial Condition").unwrap();
        assert_eq!(caps.name("num").unwrap().as_str(), "Item 2.02 ");
    }

    #[test]
    fn test_custom_patterns_are_added() {
        let custom = vec![CustomPattern {
            section_type: SectionType::RiskFactors,
            phrase: "Risks Related to Our Business".to_string(),
            kind: PatternKind::Synonym,
            numbering: NumberingPolicy::Optional,
        }];
        let table = PatternTable::with_custom(&custom).unwrap();
        let standard = PatternTable::standard().unwrap();
        assert_eq!(
            table.patterns_for(SectionType::RiskFactors).len(),
            standard.patterns_for(SectionType::RiskFactors).len() + 1
        );
    }
}
