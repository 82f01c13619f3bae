// src/extractors/ranker.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::extractors::types::{Candidate, MatchContext};

/// Candidates inside the front matter / ToC keep less than half their score.
pub const FRONT_MATTER_FACTOR: f64 = 0.45;
/// Repeats of a heading that shows up on every page (running header).
pub const RUNNING_HEADER_FACTOR: f64 = 0.5;
/// Occurrences of one heading line before it counts as a running header.
pub const RUNNING_HEADER_MIN_REPEATS: usize = 3;

const MAX_FRONT_MATTER_WINDOW: usize = 1_500;
/// Max distance between consecutive ToC lines of one cluster.
const MAX_TOC_GAP: usize = 3_000;
const MIN_TOC_LINES: usize = 3;

// --- Structural markers (Lazy Static) ---
static TOC_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:table\s+of\s+contents|index)[ \t]*$")
        .expect("Failed to compile TOC_MARKER_RE")
});

// "Item 1A. Risk Factors ..... 12", "PART II. OTHER INFORMATION 31"
static TOC_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:part[ \t]+[ivx]+|item\s*\d{1,2}[a-z]?(?:\.\d{2})?)\b[^\n]{0,200}?[\s\.·…_|]\d{1,3}[ \t]*$")
        .expect("Failed to compile TOC_LINE_RE")
});

// A bare outline entry, as in a hyperlinked ToC without page numbers
static TOC_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:part[ \t]+[ivx]+|item\s*\d{1,2}[a-z]?(?:\.\d{2})?)\b[^\n]{0,120}$")
        .expect("Failed to compile TOC_ENTRY_RE")
});

static PART_ONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*PART[ \t]+I\b").expect("Failed to compile PART_ONE_RE")
});

/// Estimates where the document body begins, i.e. where the table of contents
/// (if any) ends. Real headings are expected after this offset.
pub fn estimate_body_start(text: &str) -> usize {
    let front_limit = text.len() / 3;

    let marker_end = TOC_MARKER_RE
        .find(text)
        .filter(|m| m.start() <= front_limit)
        .map(|m| m.end());

    if let Some(toc_end) = toc_region_end(text, marker_end, front_limit) {
        tracing::debug!("Table of contents ends at {}", toc_end);
        return toc_end;
    }

    if let Some(part_one) = PART_ONE_RE.find(text).filter(|m| m.start() <= text.len() / 2) {
        // The first PART I may open an outline that the body repeats
        let (outline_end, entries) = toc_entry_run(text, part_one.start());
        if entries >= MIN_TOC_LINES {
            tracing::debug!("Outline of {} entries at {}, body starts at {}", entries, part_one.start(), outline_end);
            return outline_end;
        }
        tracing::debug!("Body starts at PART I marker ({})", part_one.start());
        return part_one.start();
    }

    // No structure at all: assume a short cover page
    let window = (text.len() / 20).min(MAX_FRONT_MATTER_WINDOW);
    window / 2
}

/// End of the cluster of page-numbered Item/Part lines. With an explicit
/// "Table of Contents" marker the cluster must start near it; without one it
/// must be at least `MIN_TOC_LINES` long and sit in the front of the document.
fn toc_region_end(text: &str, marker_end: Option<usize>, front_limit: usize) -> Option<usize> {
    let anchor = marker_end.unwrap_or(0);
    let mut lines = TOC_LINE_RE.find_iter(text).filter(|m| m.start() >= anchor);

    let first = match lines.next() {
        Some(m) if marker_end.is_none() || m.start() - anchor <= MAX_TOC_GAP => m,
        // A ToC without page numbers: bare entries right after the marker
        _ => return marker_end.map(|end| toc_entry_run(text, end).0),
    };

    let mut count = 1;
    let mut cluster_end = first.end();
    for line in lines {
        if line.start() - cluster_end > MAX_TOC_GAP {
            break;
        }
        cluster_end = line.end();
        count += 1;
    }

    if marker_end.is_some() || (count >= MIN_TOC_LINES && first.start() <= front_limit) {
        Some(cluster_end)
    } else {
        None
    }
}

/// Run of consecutive outline entries starting at `from` (blank lines in
/// between are fine). Stops at the first line of prose, or at the first entry
/// seen twice, where the body repeats the outline. Returns the end of the last
/// entry and the number of entries.
fn toc_entry_run(text: &str, from: usize) -> (usize, usize) {
    let mut seen = HashSet::new();
    let (mut end, mut entries) = (from, 0);
    let mut line_start = from;
    for line in text[from..].split_inclusive('\n') {
        let start = line_start;
        line_start += line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !TOC_ENTRY_RE.is_match(trimmed) || !seen.insert(normalize_heading(trimmed)) {
            break;
        }
        end = start + line.trim_end().len();
        entries += 1;
    }
    (end, entries)
}

/// Orders candidates for one section type, best first.
#[derive(Debug, Clone)]
pub struct Ranker {
    body_start: usize,
    threshold: f64,
}

impl Ranker {
    pub fn new(body_start: usize, threshold: f64) -> Self {
        Self { body_start, threshold }
    }

    pub fn for_text(text: &str, threshold: f64) -> Self {
        Self::new(estimate_body_start(text), threshold)
    }

    pub fn body_start(&self) -> usize {
        self.body_start
    }

    /// Applies the front-matter and running-header penalties, drops everything
    /// under the threshold, and sorts: body region first, then confidence,
    /// then latest offset.
    pub fn rank(&self, candidates: impl IntoIterator<Item = Candidate>) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = candidates.into_iter().collect();
        self.damp_running_headers(&mut candidates);

        for candidate in &mut candidates {
            if candidate.offset < self.body_start {
                candidate.confidence *= FRONT_MATTER_FACTOR;
            }
        }

        let before = candidates.len();
        candidates.retain(|c| c.confidence >= self.threshold);
        if candidates.len() < before {
            tracing::trace!("Discarded {} candidates below {:.2}", before - candidates.len(), self.threshold);
        }

        candidates.sort_by(|a, b| self.compare(a, b));
        candidates
    }

    /// Offset of the best candidate, if any survives.
    pub fn select_start(&self, candidates: impl IntoIterator<Item = Candidate>) -> Option<usize> {
        self.rank(candidates).first().map(|c| c.offset)
    }

    /// Index of the best ranked candidate after `current` that satisfies
    /// `accept`. Front-matter candidates are only eligible when the list has
    /// no body candidate at all.
    pub fn next_best(&self, ranked: &[Candidate], current: usize, accept: impl Fn(&Candidate) -> bool) -> Option<usize> {
        let has_body = ranked.iter().any(|c| c.offset >= self.body_start);
        ranked
            .iter()
            .enumerate()
            .skip(current + 1)
            .find(|(_, c)| (!has_body || c.offset >= self.body_start) && accept(c))
            .map(|(idx, _)| idx)
    }

    fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        let a_body = a.offset >= self.body_start;
        let b_body = b.offset >= self.body_start;
        b_body
            .cmp(&a_body)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| b.offset.cmp(&a.offset))
    }

    /// The same heading line repeated on many pages is a running header: only
    /// its first occurrence inside the body keeps full confidence.
    fn damp_running_headers(&self, candidates: &mut [Candidate]) {
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, c) in candidates.iter().enumerate() {
            if c.context == MatchContext::Heading {
                groups.entry(normalize_heading(&c.matched)).or_default().push(idx);
            }
        }

        for indices in groups.values() {
            if indices.len() < RUNNING_HEADER_MIN_REPEATS {
                continue;
            }
            let keep = indices.iter().copied().find(|&i| candidates[i].offset >= self.body_start);
            for &i in indices {
                if Some(i) != keep {
                    candidates[i].confidence *= RUNNING_HEADER_FACTOR;
                }
            }
            tracing::debug!(
                "Heading '{}' repeats {} times, treating repeats as running headers",
                candidates[indices[0]].matched,
                indices.len()
            );
        }
    }
}

fn normalize_heading(heading: &str) -> String {
    heading.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
