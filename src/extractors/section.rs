// src/extractors/section.rs

// --- Imports ---
use crate::extractors::boundary::{fallback_end, resolve_end, Boundary, SelectedStart, TerminalMarkers};
use crate::extractors::config::{CanonicalOrder, ConflictPreference, ExtractionConfig};
use crate::extractors::matcher::HeadingMatcher;
use crate::extractors::overlap::reconcile;
use crate::extractors::patterns::PatternTable;
use crate::extractors::ranker::{estimate_body_start, Ranker};
use crate::extractors::types::{
    count_words, coverage_ratio, Candidate, ConflictResolution, Diagnostic, Document, ExtractionResult, Section,
    SectionType,
};
use crate::extractors::validator::{QualityValidator, Verdict};
use crate::utils::error::ExtractError;

// --- Data Structures ---
/// Ranked candidates of one section type and the one currently chosen.
#[derive(Debug, Clone)]
struct Selection {
    section_type: SectionType,
    ranked: Vec<Candidate>,
    pick: usize,
}

impl Selection {
    fn current(&self) -> &Candidate {
        &self.ranked[self.pick]
    }

    fn start(&self) -> SelectedStart {
        let current = self.current();
        SelectedStart {
            section_type: self.section_type,
            offset: current.offset,
            heading_end: current.heading_end(),
        }
    }
}

// --- Main Extractor Structure ---
/// Runs the whole pipeline on one document: match, rank, resolve boundaries,
/// remove overlaps, validate. Holds no per-document state, so one instance can
/// be shared across threads.
#[derive(Debug)]
pub struct SectionExtractor {
    config: ExtractionConfig,
    patterns: PatternTable,
    validator: QualityValidator,
}

impl SectionExtractor {
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        config.validate()?;
        let patterns = PatternTable::with_custom(&config.custom_patterns)?;
        let validator = QualityValidator::new(config.min_word_threshold);
        Ok(Self { config, patterns, validator })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extracts every targeted section of the document's form type.
    pub fn extract(&self, document: &Document) -> Result<ExtractionResult, ExtractError> {
        check_input(document)?;
        let text = document.text();
        tracing::info!(
            "Extracting sections from {} ({}, {} words)",
            document.id,
            document.form_type,
            document.word_count()
        );

        let targets = self.config.targets_for(document.form_type);
        let order = CanonicalOrder::new(targets.clone());
        let ranker = Ranker::for_text(text, self.config.confidence_threshold);
        let matcher = HeadingMatcher::new(&self.patterns);
        tracing::debug!("{}: body starts at {}", document.id, ranker.body_start());

        // 1. Match and rank candidates per section type
        let mut diagnostics = Vec::new();
        let mut selections = Vec::with_capacity(targets.len());
        for &section_type in &targets {
            let ranked = ranker.rank(matcher.find_candidates(text, section_type));
            match ranked.first() {
                Some(best) => {
                    tracing::debug!(
                        "{:?} starts at {} ('{}', {:.3}) out of {} candidates",
                        section_type,
                        best.offset,
                        best.matched,
                        best.confidence,
                        ranked.len()
                    );
                    selections.push(Selection { section_type, ranked, pick: 0 });
                }
                None => {
                    tracing::debug!("{:?} not found in {}", section_type, document.id);
                    diagnostics.push(Diagnostic::SectionAbsent { section_type });
                }
            }
        }

        // 2. Boundaries, repairing detections that contradict the canonical order
        let terminals = TerminalMarkers::scan(text, ranker.body_start(), self.config.stop_at_item_headings);
        self.settle_order(&mut selections, &ranker, text.len(), &terminals, &order, &mut diagnostics);
        let spans = self.resolve_spans(&selections, text.len(), &terminals, &order);

        let sections: Vec<Section> = selections
            .iter()
            .zip(spans)
            .map(|(selection, end)| {
                let current = selection.current();
                Section {
                    section_type: selection.section_type,
                    start: current.offset,
                    end,
                    word_count: text.get(current.offset..end).map(count_words).unwrap_or(0),
                    confidence: current.confidence,
                    heading: current.matched.split_whitespace().collect::<Vec<_>>().join(" "),
                }
            })
            .collect();

        // 3. Disjoint spans
        let (sections, overlap_diagnostics) =
            reconcile(sections, text, self.config.min_word_threshold, self.config.conflict_preference);
        diagnostics.extend(overlap_diagnostics);

        // 4. Quality checks
        let mut accepted = Vec::with_capacity(sections.len());
        for section in sections {
            match self.validator.validate(&section, text) {
                Verdict::Accept(warnings) => {
                    for warning in warnings {
                        tracing::warn!("{} {:?}: {}", document.id, section.section_type, warning);
                        diagnostics.push(Diagnostic::Warning { section_type: section.section_type, warning });
                    }
                    accepted.push(section);
                }
                Verdict::Reject(reason) => {
                    tracing::info!("{} {:?} rejected: {}", document.id, section.section_type, reason);
                    diagnostics.push(Diagnostic::Rejected { section, reason });
                }
            }
        }
        accepted.sort_by_key(|s| s.start);

        let extracted: usize = accepted.iter().map(|s| s.word_count).sum();
        let coverage = coverage_ratio(extracted, document.word_count());
        let result = ExtractionResult {
            document_id: document.id.clone(),
            form_type: document.form_type,
            total_words: document.word_count(),
            sections: accepted,
            diagnostics,
            coverage,
        };

        if result.is_coverage_suspicious() {
            tracing::warn!(
                "{}: sections cover {:.1}% of the document, boundaries are probably too wide",
                document.id,
                coverage * 100.0
            );
        }
        tracing::info!(
            "Extracted {} sections from {} ({:.1}% coverage)",
            result.sections.len(),
            document.id,
            coverage * 100.0
        );
        Ok(result)
    }

    /// Every candidate of every targeted section type, ascending by offset,
    /// with the ranker's confidence adjustments applied. Used by debug output.
    pub fn candidates(&self, document: &Document) -> Vec<Candidate> {
        let text = document.text();
        let ranker = Ranker::new(estimate_body_start(text), 0.0);
        let matcher = HeadingMatcher::new(&self.patterns);
        let mut all: Vec<Candidate> = self
            .config
            .targets_for(document.form_type)
            .into_iter()
            .flat_map(|section_type| ranker.rank(matcher.find_candidates(text, section_type)))
            .collect();
        all.sort_by_key(|c| c.offset);
        all
    }

    /// Re-ranks until no section is followed by one that belongs before it.
    /// Every round either advances a pick or drops a selection, so the number
    /// of rounds is bounded by the total candidate count.
    fn settle_order(
        &self,
        selections: &mut Vec<Selection>,
        ranker: &Ranker,
        document_length: usize,
        terminals: &TerminalMarkers,
        order: &CanonicalOrder,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let max_rounds: usize = selections.iter().map(|s| s.ranked.len()).sum::<usize>() + selections.len();
        for _ in 0..max_rounds {
            let starts: Vec<SelectedStart> = selections.iter().map(Selection::start).collect();
            let inversion = starts.iter().find_map(|start| {
                match resolve_end(start, &starts, document_length, terminals, order) {
                    Boundary::Inverted { following, .. } => Some((start.section_type, following)),
                    Boundary::End(_) => None,
                }
            });
            let Some((leading, following)) = inversion else {
                return;
            };

            let resolution = self.repair(selections, ranker, leading, following);
            tracing::warn!(
                "Boundary conflict: {:?} precedes {:?} in the text, resolved by {:?}",
                leading,
                following,
                resolution
            );
            diagnostics.push(Diagnostic::BoundaryConflict { leading, following, resolution });
        }
    }

    /// Settles one inverted pair. `leading` appears first in the text but
    /// belongs after `following`.
    fn repair(
        &self,
        selections: &mut Vec<Selection>,
        ranker: &Ranker,
        leading: SectionType,
        following: SectionType,
    ) -> ConflictResolution {
        let (Some(li), Some(fi)) = (
            selections.iter().position(|s| s.section_type == leading),
            selections.iter().position(|s| s.section_type == following),
        ) else {
            return ConflictResolution::Dropped { section_type: following };
        };
        let leading_offset = selections[li].current().offset;
        let following_offset = selections[fi].current().offset;

        // Move the canonically earlier section in front of the other one
        if let Some(pick) = ranker.next_best(&selections[fi].ranked, selections[fi].pick, |c| c.offset < leading_offset) {
            selections[fi].pick = pick;
            return ConflictResolution::Reranked { section_type: following, offset: selections[fi].current().offset };
        }

        // Or the canonically later section behind it
        if let Some(pick) = ranker.next_best(&selections[li].ranked, selections[li].pick, |c| c.offset > following_offset) {
            selections[li].pick = pick;
            return ConflictResolution::Reranked { section_type: leading, offset: selections[li].current().offset };
        }

        let drop_following = match self.config.conflict_preference {
            ConflictPreference::HigherConfidence => {
                selections[fi].current().confidence <= selections[li].current().confidence
            }
            ConflictPreference::Earlier => true,
            ConflictPreference::Later => false,
        };
        let (index, section_type) = if drop_following { (fi, following) } else { (li, leading) };
        selections.remove(index);
        ConflictResolution::Dropped { section_type }
    }

    /// End offset of each selection, in selection order.
    fn resolve_spans(
        &self,
        selections: &[Selection],
        document_length: usize,
        terminals: &TerminalMarkers,
        order: &CanonicalOrder,
    ) -> Vec<usize> {
        let starts: Vec<SelectedStart> = selections.iter().map(Selection::start).collect();
        starts
            .iter()
            .map(|start| match resolve_end(start, &starts, document_length, terminals, order) {
                Boundary::End(end) => end,
                Boundary::Inverted { following, following_start } => {
                    tracing::warn!(
                        "{:?} still precedes {:?}, ending it at {}",
                        start.section_type,
                        following,
                        following_start
                    );
                    fallback_end(start, following_start, document_length, terminals)
                }
            })
            .collect()
    }
}

/// Empty, whitespace-only and binary input cannot be extracted.
fn check_input(document: &Document) -> Result<(), ExtractError> {
    if document.text().trim().is_empty() {
        return Err(ExtractError::MalformedInput(format!("{} has no text", document.id)));
    }
    if document.text().contains('\0') {
        return Err(ExtractError::MalformedInput(format!("{} contains NUL bytes, not a text filing", document.id)));
    }
    Ok(())
}
