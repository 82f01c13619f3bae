// src/extractors/boundary.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::extractors::config::CanonicalOrder;
use crate::extractors::matcher::{is_reference_line, is_toc_tail};
use crate::extractors::ranker::RUNNING_HEADER_MIN_REPEATS;
use crate::extractors::types::SectionType;

// --- Terminal markers (Lazy Static) ---
// Signatures / exhibits close the reportable content of a filing
static SIGNATURES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?P<t>SIGNATURES?)[ \t]*$").expect("Failed to compile SIGNATURES_RE")
});

static EXHIBIT_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?P<t>EXHIBIT\s+INDEX)\b").expect("Failed to compile EXHIBIT_INDEX_RE")
});

static EXHIBITS_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?P<t>Item\s*\d{1,2}[A-Z]?\s*[\.:\-–—]?\s*Exhibits\b)[^\n]*$")
        .expect("Failed to compile EXHIBITS_ITEM_RE")
});

// A section never runs across a Part heading
static PART_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?P<t>PART[ \t]+(?:II|III|IV)\b)[^\n]*$").expect("Failed to compile PART_HEADING_RE")
});

// Any numbered item heading: "Item 1B. Unresolved Staff Comments", "Item 7.01 Regulation FD"
static ITEM_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?P<t>Item\s*\d{1,2}[A-Z]?(?:\.\d{2}\s*[\.:\-–—]?|\s*[\.:\-–—])\s*\S[^\n]{0,150})$")
        .expect("Failed to compile ITEM_HEADING_RE")
});

/// Sorted offsets where section content must stop regardless of which
/// section comes next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalMarkers {
    offsets: Vec<usize>,
}

impl TerminalMarkers {
    pub fn new(mut offsets: Vec<usize>) -> Self {
        offsets.sort_unstable();
        offsets.dedup();
        Self { offsets }
    }

    /// Collects terminal markers located in the body (after `body_start`).
    /// ToC lines are never terminals, neither are item lines that merely refer
    /// to an item. A Part line repeated on every page only counts once.
    pub fn scan(text: &str, body_start: usize, include_item_headings: bool) -> Self {
        let mut offsets = Vec::new();
        for re in [&*SIGNATURES_RE, &*EXHIBIT_INDEX_RE, &*EXHIBITS_ITEM_RE] {
            offsets.extend(body_markers(re, text, body_start).map(|(marker, _)| marker));
        }

        let mut part_lines: HashMap<String, Vec<usize>> = HashMap::new();
        for (marker, line) in body_markers(&PART_HEADING_RE, text, body_start) {
            part_lines.entry(normalize_line(line)).or_default().push(marker);
        }
        for (line, repeats) in part_lines {
            if repeats.len() >= RUNNING_HEADER_MIN_REPEATS {
                tracing::debug!("'{}' repeats {} times, keeping only the first as a terminal", line, repeats.len());
                offsets.extend(repeats.first().copied());
            } else {
                offsets.extend(repeats);
            }
        }

        if include_item_headings {
            for caps in ITEM_HEADING_RE.captures_iter(text) {
                let (Some(line), Some(marker)) = (caps.get(0), caps.name("t")) else { continue };
                if marker.start() < body_start || is_toc_tail(line.as_str()) {
                    continue;
                }
                if is_reference_line(text, line.start(), line.end()) {
                    tracing::trace!("Item line at {} is a reference, not a terminal", marker.start());
                    continue;
                }
                offsets.push(marker.start());
            }
        }

        let markers = Self::new(offsets);
        tracing::debug!("Found {} terminal markers after offset {}", markers.offsets.len(), body_start);
        markers
    }

    /// First marker at or after `pos`.
    pub fn next_at_or_after(&self, pos: usize) -> Option<usize> {
        let idx = self.offsets.partition_point(|&o| o < pos);
        self.offsets.get(idx).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Marker offsets (group `t`) and their lines, past `body_start`, ToC lines excluded.
fn body_markers<'t>(re: &'t Regex, text: &'t str, body_start: usize) -> impl Iterator<Item = (usize, &'t str)> + 't {
    re.captures_iter(text).filter_map(move |caps| {
        let (line, marker) = (caps.get(0)?, caps.name("t")?);
        if marker.start() < body_start || is_toc_tail(line.as_str()) {
            return None;
        }
        Some((marker.start(), line.as_str()))
    })
}

fn normalize_line(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

/// A section start chosen by the ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedStart {
    pub section_type: SectionType,
    pub offset: usize,
    pub heading_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    End(usize),
    /// The nearest following start belongs to a section that should come
    /// before this one: one of the two detections is probably wrong.
    Inverted { following: SectionType, following_start: usize },
}

/// Ends a section at the nearest following selected start, clipped to the
/// first terminal marker after its heading, or at the end of the document.
pub fn resolve_end(
    current: &SelectedStart,
    selected: &[SelectedStart],
    document_length: usize,
    terminals: &TerminalMarkers,
    order: &CanonicalOrder,
) -> Boundary {
    let next = selected
        .iter()
        .filter(|s| s.offset > current.offset)
        .min_by_key(|s| s.offset);

    if let Some(next) = next {
        if order.precedes(next.section_type, current.section_type) {
            tracing::debug!(
                "{:?} at {} is followed by {:?} at {}, which belongs before it",
                current.section_type,
                current.offset,
                next.section_type,
                next.offset
            );
            return Boundary::Inverted { following: next.section_type, following_start: next.offset };
        }
    }

    Boundary::End(clipped_end(current, next.map(|n| n.offset), document_length, terminals))
}

/// End used once inversions can no longer be repaired: treat the following
/// start as an ordinary boundary.
pub fn fallback_end(current: &SelectedStart, following_start: usize, document_length: usize, terminals: &TerminalMarkers) -> usize {
    clipped_end(current, Some(following_start), document_length, terminals)
}

fn clipped_end(current: &SelectedStart, next_start: Option<usize>, document_length: usize, terminals: &TerminalMarkers) -> usize {
    let mut end = next_start.unwrap_or(document_length).min(document_length);
    if let Some(terminal) = terminals.next_at_or_after(current.heading_end) {
        end = end.min(terminal);
    }
    end
}
