// src/extractors/validator.rs
use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

use crate::extractors::types::{QualityWarning, RejectReason, Section};

const MIN_WORDS_FOR_CAPS_CHECK: usize = 20;
const MAX_UPPERCASE_SHARE: f64 = 0.6;
const MAX_BOILERPLATE_SHARE: f64 = 0.6;
const MIN_SENTENCES_FOR_BOILERPLATE: usize = 2;

// Legal / administrative phrasing that carries no section-specific content
static BOILERPLATE_RE: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"(?i)\bnot\s+applicable\b",
        r"(?i)^\W*none\W*$",
        r"(?i)\bincorporated\s+(?:herein\s+)?by\s+reference\b",
        r"(?i)\bpursuant\s+to\s+the\s+requirements\s+of\b",
        r"(?i)\bsecurities\s+exchange\s+act\s+of\s+1934\b",
        r"(?i)\bfurnished\s+and\s+shall\s+not\s+be\s+deemed\b",
        r"(?i)\bsubject\s+to\s+the\s+liabilities\s+of\b",
        r"(?i)\bindicate\s+by\s+check\s+mark\b",
        r"(?i)\bduly\s+caused\s+this\s+report\s+to\s+be\s+signed\b",
        r"(?i)\bforward[-\s]looking\s+statements\b",
        r"(?i)\bundue\s+reliance\b",
        r"(?i)\b17\s+CFR\b",
    ])
    .expect("Failed to compile BOILERPLATE_RE")
});

static SENTENCE_SPLIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.!?]+\s+|\n\s*\n").expect("Failed to compile SENTENCE_SPLIT_RE")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept(Vec<QualityWarning>),
    Reject(RejectReason),
}

/// Final content checks on a reconciled section.
#[derive(Debug, Clone, Copy)]
pub struct QualityValidator {
    min_words: usize,
}

impl QualityValidator {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }

    pub fn validate(&self, section: &Section, text: &str) -> Verdict {
        if section.end <= section.start || section.end > text.len() {
            tracing::error!(
                "{:?} has an inverted boundary [{}, {}) in a {} byte document",
                section.section_type,
                section.start,
                section.end,
                text.len()
            );
            return Verdict::Reject(RejectReason::BoundaryInverted);
        }

        if section.word_count < self.min_words {
            tracing::debug!(
                "{:?} rejected: {} words, required {}",
                section.section_type,
                section.word_count,
                self.min_words
            );
            return Verdict::Reject(RejectReason::TooShort);
        }

        let body = section.text(text);
        let mut warnings = Vec::new();
        if mostly_uppercase(body) {
            warnings.push(QualityWarning::SuspiciousAllCaps);
        }
        if mostly_boilerplate(body) {
            warnings.push(QualityWarning::Boilerplate);
        }
        Verdict::Accept(warnings)
    }
}

fn mostly_uppercase(body: &str) -> bool {
    let alphabetic: Vec<&str> = body
        .split_whitespace()
        .filter(|w| w.chars().filter(|c| c.is_alphabetic()).count() >= 2)
        .collect();
    if alphabetic.len() < MIN_WORDS_FOR_CAPS_CHECK {
        return false;
    }
    let upper = alphabetic
        .iter()
        .filter(|w| w.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase))
        .count();
    upper as f64 / alphabetic.len() as f64 > MAX_UPPERCASE_SHARE
}

fn mostly_boilerplate(body: &str) -> bool {
    let sentences: Vec<&str> = SENTENCE_SPLIT_RE
        .split(body)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if sentences.len() < MIN_SENTENCES_FOR_BOILERPLATE {
        return sentences.first().is_some_and(|s| BOILERPLATE_RE.is_match(s));
    }
    let hits = sentences.iter().filter(|s| BOILERPLATE_RE.is_match(s)).count();
    hits as f64 / sentences.len() as f64 > MAX_BOILERPLATE_SHARE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::types::{count_words, SectionType};

    fn section_over(text: &str) -> Section {
        Section {
            section_type: SectionType::OtherInformation,
            start: 0,
            end: text.len(),
            word_count: count_words(text),
            confidence: 1.0,
            heading: String::new(),
        }
    }

    #[test]
    fn test_accepts_plain_prose() {
        let text = "Revenue increased in the quarter as demand for our products grew. ".repeat(10);
        assert_eq!(QualityValidator::new(50).validate(&section_over(&text), &text), Verdict::Accept(vec![]));
    }

    #[test]
    fn test_rejects_short_section() {
        let text = "Item 5. Other Information\nNone.";
        assert_eq!(
            QualityValidator::new(50).validate(&section_over(text), text),
            Verdict::Reject(RejectReason::TooShort)
        );
    }

    #[test]
    fn test_rejects_inverted_boundary() {
        let text = "some words here";
        let mut section = section_over(text);
        section.start = 10;
        section.end = 5;
        assert_eq!(
            QualityValidator::new(1).validate(&section, text),
            Verdict::Reject(RejectReason::BoundaryInverted)
        );
    }

    #[test]
    fn test_warns_on_all_caps() {
        let text = "THIS SECTION IS WRITTEN ENTIRELY IN CAPITAL LETTERS FOR NO GOOD REASON ".repeat(3);
        assert_eq!(
            QualityValidator::new(10).validate(&section_over(&text), &text),
            Verdict::Accept(vec![QualityWarning::SuspiciousAllCaps])
        );
    }

    #[test]
    fn test_warns_on_boilerplate() {
        let text = "The exhibit is incorporated herein by reference. This item is not applicable to the registrant. \
                    The information is furnished and shall not be deemed filed. Forward-looking statements speak only as of today. \
                    We had good results.";
        let verdict = QualityValidator::new(10).validate(&section_over(text), text);
        assert_eq!(verdict, Verdict::Accept(vec![QualityWarning::Boilerplate]));
    }
}
