// src/extractors/config.rs
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::extractors::patterns::{NumberingPolicy, PatternKind};
use crate::extractors::types::{FormType, SectionType};
use crate::utils::error::ExtractError;

pub const DEFAULT_MIN_WORDS: usize = 50;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Which section survives when two sections cannot both be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPreference {
    /// Keep the higher-confidence section; ties keep the one earlier in the document.
    #[default]
    HigherConfidence,
    /// Keep the section that appears first in the document.
    Earlier,
    /// Keep the section that appears last in the document.
    Later,
}

/// Extra heading phrase supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub section_type: SectionType,
    pub phrase: String,
    #[serde(default = "default_custom_kind")]
    pub kind: PatternKind,
    #[serde(default)]
    pub numbering: NumberingPolicy,
}

fn default_custom_kind() -> PatternKind {
    PatternKind::Synonym
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub min_word_threshold: usize,
    pub confidence_threshold: f64,
    pub recognized_section_types: BTreeSet<SectionType>,
    /// Expected sections per form, listed in the order they appear in that form.
    pub form_type_hints: BTreeMap<FormType, Vec<SectionType>>,
    pub conflict_preference: ConflictPreference,
    /// End sections at numbered "Item N." headings of items nobody asked for.
    pub stop_at_item_headings: bool,
    pub custom_patterns: Vec<CustomPattern>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        let mut form_type_hints = BTreeMap::new();
        form_type_hints.insert(
            FormType::TenK,
            vec![
                SectionType::Business,
                SectionType::RiskFactors,
                SectionType::LegalProceedings,
                SectionType::ManagementDiscussion,
                SectionType::MarketRisk,
                SectionType::FinancialStatements,
                SectionType::ControlsAndProcedures,
                SectionType::OtherInformation,
            ],
        );
        form_type_hints.insert(
            FormType::TenQ,
            vec![
                SectionType::FinancialStatements,
                SectionType::ManagementDiscussion,
                SectionType::MarketRisk,
                SectionType::ControlsAndProcedures,
                SectionType::LegalProceedings,
                SectionType::RiskFactors,
                SectionType::OtherInformation,
            ],
        );
        form_type_hints.insert(
            FormType::EightK,
            vec![
                SectionType::ResultsOfOperations,
                SectionType::RegulationFd,
                SectionType::OtherEvents,
                SectionType::FinancialStatementsAndExhibits,
            ],
        );

        Self {
            min_word_threshold: DEFAULT_MIN_WORDS,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            recognized_section_types: SectionType::ALL.into_iter().collect(),
            form_type_hints,
            conflict_preference: ConflictPreference::default(),
            stop_at_item_headings: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl ExtractionConfig {
    /// Loads a JSON config file. Missing fields fall back to defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ExtractError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: ExtractionConfig = serde_json::from_str(&raw)
            .map_err(|e| ExtractError::InvalidConfig(format!("Cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        tracing::debug!("Loaded extraction config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ExtractError::InvalidConfig(format!(
                "confidence_threshold must be within 0..=1, got {}",
                self.confidence_threshold
            )));
        }
        if self.min_word_threshold == 0 {
            return Err(ExtractError::InvalidConfig("min_word_threshold must be at least 1".to_string()));
        }
        if let Some(bad) = self.custom_patterns.iter().find(|p| p.phrase.trim().is_empty()) {
            return Err(ExtractError::InvalidConfig(format!("Empty custom phrase for {}", bad.section_type)));
        }
        Ok(())
    }

    /// Sections to look for in a form, in that form's canonical document order.
    pub fn targets_for(&self, form_type: FormType) -> Vec<SectionType> {
        match self.form_type_hints.get(&form_type) {
            Some(hinted) => {
                let mut seen = BTreeSet::new();
                hinted
                    .iter()
                    .copied()
                    .filter(|t| self.recognized_section_types.contains(t) && seen.insert(*t))
                    .collect()
            }
            None => self.recognized_section_types.iter().copied().collect(),
        }
    }
}

/// Canonical position of each targeted section for one form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalOrder {
    sequence: Vec<SectionType>,
}

impl CanonicalOrder {
    pub fn new(sequence: Vec<SectionType>) -> Self {
        Self { sequence }
    }

    /// Unlisted sections sort after every listed one, by declaration order.
    pub fn position(&self, section_type: SectionType) -> usize {
        self.sequence
            .iter()
            .position(|t| *t == section_type)
            .unwrap_or(self.sequence.len() + section_type as usize)
    }

    pub fn precedes(&self, a: SectionType, b: SectionType) -> bool {
        self.position(a) < self.position(b)
    }

    pub fn sections(&self) -> &[SectionType] {
        &self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recognized_section_types.len(), SectionType::ALL.len());
    }

    #[test]
    fn test_targets_follow_form_hints() {
        let config = ExtractionConfig::default();
        let ten_q = config.targets_for(FormType::TenQ);
        assert_eq!(ten_q.first(), Some(&SectionType::FinancialStatements));
        assert!(!ten_q.contains(&SectionType::Business), "10-Q has no Business item");

        let eight_k = config.targets_for(FormType::EightK);
        assert_eq!(eight_k.len(), 4);
        assert!(!eight_k.contains(&SectionType::ManagementDiscussion));
    }

    #[test]
    fn test_targets_respect_recognized_set() {
        let mut config = ExtractionConfig::default();
        config.recognized_section_types = [SectionType::ManagementDiscussion, SectionType::RiskFactors].into_iter().collect();
        assert_eq!(
            config.targets_for(FormType::TenQ),
            vec![SectionType::ManagementDiscussion, SectionType::RiskFactors]
        );

        config.form_type_hints.clear();
        assert_eq!(
            config.targets_for(FormType::TenK),
            vec![SectionType::RiskFactors, SectionType::ManagementDiscussion],
            "Without hints the declaration order applies"
        );
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = ExtractionConfig::default();
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = ExtractionConfig::default();
        config.min_word_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "min_word_threshold": 10, "conflict_preference": "later",
                        "form_type_hints": { "8-K": ["other_events"] } }"#;
        let config: ExtractionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.min_word_threshold, 10);
        assert_eq!(config.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(config.conflict_preference, ConflictPreference::Later);
        assert_eq!(config.targets_for(FormType::EightK), vec![SectionType::OtherEvents]);
        assert!(config.form_type_hints.get(&FormType::TenQ).is_none(), "Explicit hints replace the defaults");
    }

    #[test]
    fn test_canonical_order_positions() {
        let order = CanonicalOrder::new(vec![SectionType::ManagementDiscussion, SectionType::ControlsAndProcedures]);
        assert!(order.precedes(SectionType::ManagementDiscussion, SectionType::ControlsAndProcedures));
        assert!(!order.precedes(SectionType::ControlsAndProcedures, SectionType::ManagementDiscussion));
        assert!(order.precedes(SectionType::ControlsAndProcedures, SectionType::Business), "Unlisted sections go last");
    }
}
