// src/extractors/overlap.rs
use crate::extractors::config::ConflictPreference;
use crate::extractors::types::{count_words, Diagnostic, Section};

/// Makes section spans pairwise disjoint.
///
/// Sections are processed in start order. When two overlap, the earlier one
/// is truncated to the later start. If that would leave it under `min_words`
/// words, one of the pair is dropped instead, chosen by `preference`.
pub fn reconcile(
    mut sections: Vec<Section>,
    text: &str,
    min_words: usize,
    preference: ConflictPreference,
) -> (Vec<Section>, Vec<Diagnostic>) {
    sections.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    let mut kept: Vec<Section> = Vec::with_capacity(sections.len());
    let mut diagnostics = Vec::new();

    for section in sections {
        let Some(previous) = kept.last_mut() else {
            kept.push(section);
            continue;
        };
        if !previous.overlaps(&section) {
            kept.push(section);
            continue;
        }

        let truncated_words = text.get(previous.start..section.start).map(count_words).unwrap_or(0);
        if section.start > previous.start && truncated_words >= min_words {
            tracing::debug!(
                "Truncating {:?} from {} to {} to make room for {:?}",
                previous.section_type,
                previous.end,
                section.start,
                section.section_type
            );
            diagnostics.push(Diagnostic::OverlapTruncated {
                section_type: previous.section_type,
                previous_end: previous.end,
                new_end: section.start,
            });
            previous.end = section.start;
            previous.word_count = truncated_words;
            kept.push(section);
            continue;
        }

        if keep_later(previous, &section, preference) {
            tracing::warn!("Dropping {:?}: overlaps {:?}", previous.section_type, section.section_type);
            diagnostics.push(Diagnostic::OverlapDropped {
                section_type: previous.section_type,
                kept: section.section_type,
            });
            // Sorted and disjoint so far: the section before `previous` ends before `section` starts
            kept.pop();
            kept.push(section);
        } else {
            tracing::warn!("Dropping {:?}: overlaps {:?}", section.section_type, previous.section_type);
            diagnostics.push(Diagnostic::OverlapDropped {
                section_type: section.section_type,
                kept: previous.section_type,
            });
        }
    }

    (kept, diagnostics)
}

fn keep_later(earlier: &Section, later: &Section, preference: ConflictPreference) -> bool {
    match preference {
        ConflictPreference::HigherConfidence => later.confidence > earlier.confidence,
        ConflictPreference::Earlier => false,
        ConflictPreference::Later => true,
    }
}
