// src/extractors/matcher.rs
use once_cell::sync::Lazy;
use regex::{CaptureMatches, Regex};

use crate::extractors::patterns::{CompiledPattern, PatternTable};
use crate::extractors::types::{Candidate, MatchContext, SectionType};

// --- Scoring ---
const UNNUMBERED_FACTOR: f64 = 0.85;
const INLINE_NUMBERED_FACTOR: f64 = 0.6;
const INLINE_UNNUMBERED_FACTOR: f64 = 0.4;
const CROSS_REFERENCE_FACTOR: f64 = 0.3;
const TOC_LINE_FACTOR: f64 = 0.4;

/// How far back on the same line we look for reference wording.
const LOOKBACK_BYTES: usize = 80;

// Rest of a ToC line: optional words, then dot leaders / spaces and a page number
static TOC_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\n]{0,200}?(?:^|[\s\.·…_|])\d{1,3}\s*$")
        .expect("Failed to compile TOC_TAIL_RE")
});

// Wording right before a mention that makes it a reference, not a heading
static REFERENCE_LEAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:see|refer\s+to|in|under|within|entitled|captioned|described\s+in|discussed\s+in|included\s+in|set\s+forth\s+in|contained\s+in)\s*["“(]?\s*(?:part\s+[iv]+\s*,?\s*)?$"#,
    )
    .expect("Failed to compile REFERENCE_LEAD_RE")
});

// Wording right after a mention that makes it a reference
static REFERENCE_TAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^(?:[)"”]|,?\s*(?:of|in)\s+(?:our|the|this|part|such)\b|,?\s*included\b)"#)
        .expect("Failed to compile REFERENCE_TAIL_RE")
});

// Mentions of another filing or of this report anywhere on the line
static DOCUMENT_REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:of|in)\s+(?:our|the|this|its)\s+(?:(?:\d{4}|most\s+recent)\s+)?(?:annual|quarterly|current)\s+report\b|\bon\s+form\s+(?:10-?[kq]|8-?k)\b",
    )
    .expect("Failed to compile DOCUMENT_REFERENCE_RE")
});

/// Scans document text for heading occurrences of one section type.
pub struct HeadingMatcher<'p> {
    table: &'p PatternTable,
}

impl<'p> HeadingMatcher<'p> {
    pub fn new(table: &'p PatternTable) -> Self {
        Self { table }
    }

    /// Lazily yields candidates in ascending offset order. Overlapping matches
    /// of different patterns collapse into the best scoring one.
    pub fn find_candidates<'t>(&self, text: &'t str, section_type: SectionType) -> Candidates<'p, 't> {
        let mut streams: Vec<Stream<'p, 't>> = self
            .table
            .patterns_for(section_type)
            .iter()
            .map(|pattern| Stream { pattern, matches: pattern.regex.captures_iter(text), head: None })
            .collect();
        for stream in &mut streams {
            stream.advance(text);
        }
        Candidates { text, streams, pending: None }
    }
}

struct Stream<'p, 't> {
    pattern: &'p CompiledPattern,
    matches: CaptureMatches<'p, 't>,
    head: Option<Candidate>,
}

impl<'p, 't> Stream<'p, 't> {
    fn advance(&mut self, text: &'t str) {
        self.head = None;
        for caps in self.matches.by_ref() {
            if let Some(whole) = caps.get(0) {
                let numbered = caps.name("num").is_some();
                self.head = Some(build_candidate(self.pattern, text, whole.start(), whole.end(), numbered));
                return;
            }
        }
    }
}

pub struct Candidates<'p, 't> {
    text: &'t str,
    streams: Vec<Stream<'p, 't>>,
    pending: Option<Candidate>,
}

impl<'p, 't> Candidates<'p, 't> {
    /// Next match across all pattern streams, smallest offset first.
    fn next_raw(&mut self) -> Option<Candidate> {
        let mut best: Option<usize> = None;
        for (idx, stream) in self.streams.iter().enumerate() {
            let Some(head) = &stream.head else { continue };
            let better = match best.and_then(|b| self.streams[b].head.as_ref()) {
                None => true,
                Some(current) => {
                    head.offset < current.offset
                        || (head.offset == current.offset && head.confidence > current.confidence)
                }
            };
            if better {
                best = Some(idx);
            }
        }

        let idx = best?;
        let candidate = self.streams[idx].head.take();
        self.streams[idx].advance(self.text);
        candidate
    }
}

impl Iterator for Candidates<'_, '_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            let Some(next) = self.next_raw() else {
                return self.pending.take();
            };
            match self.pending.take() {
                None => self.pending = Some(next),
                Some(pending) if next.offset < pending.heading_end() => {
                    self.pending = Some(stronger(pending, next));
                }
                Some(pending) => {
                    self.pending = Some(next);
                    return Some(pending);
                }
            }
        }
    }
}

/// Higher confidence wins, then the longer match, then the earlier one.
fn stronger(a: Candidate, b: Candidate) -> Candidate {
    if b.confidence > a.confidence || (b.confidence == a.confidence && b.matched.len() > a.matched.len()) {
        b
    } else {
        a
    }
}

fn build_candidate(pattern: &CompiledPattern, text: &str, start: usize, end: usize, numbered: bool) -> Candidate {
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = text[end..].find('\n').map_or(text.len(), |i| end + i);
    let at_line_start = text[line_start..start].trim().is_empty();
    let tail = &text[end..line_end];

    let context = if is_toc_tail(tail) {
        MatchContext::TableOfContents
    } else if is_cross_reference(text, line_start, start, tail) {
        MatchContext::CrossReference
    } else if at_line_start {
        MatchContext::Heading
    } else {
        MatchContext::Inline
    };

    let mut confidence = pattern.pattern.kind.base_score();
    if !numbered {
        confidence *= UNNUMBERED_FACTOR;
    }
    if !at_line_start {
        confidence *= if numbered { INLINE_NUMBERED_FACTOR } else { INLINE_UNNUMBERED_FACTOR };
    }
    match context {
        MatchContext::CrossReference => confidence *= CROSS_REFERENCE_FACTOR,
        MatchContext::TableOfContents => confidence *= TOC_LINE_FACTOR,
        MatchContext::Heading | MatchContext::Inline => {}
    }

    let candidate = Candidate {
        section_type: pattern.section_type,
        offset: start,
        matched: text[start..end].to_string(),
        confidence,
        context,
    };
    tracing::trace!(
        "Candidate {:?} at {} ({:?}, {:.3}): '{}'",
        candidate.section_type,
        candidate.offset,
        candidate.context,
        candidate.confidence,
        candidate.matched
    );
    candidate
}

/// True when the rest of the line looks like a page reference.
pub fn is_toc_tail(tail: &str) -> bool {
    let tail = tail.trim_end();
    !tail.is_empty() && TOC_TAIL_RE.is_match(tail)
}

/// True when a line starting with an item number is a reference to that item
/// (wrapped out of the previous sentence, or pointing at another filing)
/// rather than its heading.
pub fn is_reference_line(text: &str, line_start: usize, line_end: usize) -> bool {
    DOCUMENT_REFERENCE_RE.is_match(&text[line_start..line_end]) || previous_line_leads_in(text, line_start)
}

/// The line right above ends in reference wording ("... as discussed in").
fn previous_line_leads_in(text: &str, line_start: usize) -> bool {
    let Some(before) = text[..line_start].strip_suffix('\n') else {
        return false;
    };
    let before = before.trim_end_matches([' ', '\t', '\r']);
    let prev_start = before.rfind('\n').map_or(0, |i| i + 1);
    let mut window_start = before.len().saturating_sub(LOOKBACK_BYTES).max(prev_start);
    while !before.is_char_boundary(window_start) {
        window_start += 1;
    }
    let prev = &before[window_start..];
    !prev.trim().is_empty() && REFERENCE_LEAD_RE.is_match(prev)
}

fn is_cross_reference(text: &str, line_start: usize, start: usize, tail: &str) -> bool {
    let mut window_start = start.saturating_sub(LOOKBACK_BYTES).max(line_start);
    while !text.is_char_boundary(window_start) {
        window_start += 1;
    }
    let before = &text[window_start..start];

    let open_paren = before.matches('(').count() > before.matches(')').count();
    let open_quote = before.matches('"').count() % 2 == 1 || before.rfind('“') > before.rfind('”');
    let lead_in = REFERENCE_LEAD_RE.is_match(before);
    let trailing = REFERENCE_TAIL_RE.is_match(tail.trim_start()) || DOCUMENT_REFERENCE_RE.is_match(tail);
    let wrapped = before.trim().is_empty() && previous_line_leads_in(text, line_start);

    open_paren || open_quote || lead_in || trailing || wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(text: &str, section_type: SectionType) -> Vec<Candidate> {
        let table = PatternTable::standard().unwrap();
        HeadingMatcher::new(&table).find_candidates(text, section_type).collect()
    }

    #[test]
    fn test_numbered_heading_scores_highest() {
        let text = "Some intro text.\nItem 1A. Risk Factors\nOur business is exposed to many uncertainties.";
        let found = candidates(text, SectionType::RiskFactors);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].offset, text.find("Item 1A").unwrap());
        assert_eq!(found[0].context, MatchContext::Heading);
        assert!((found[0].confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_candidates_are_sorted_and_deduplicated() {
        let text = "MD&A\nfiller words here\nItem 2. Management's Discussion and Analysis of Financial Condition\nmore";
        let found = candidates(text, SectionType::ManagementDiscussion);
        assert_eq!(found.len(), 2, "Full title and synonym at one offset collapse: {:?}", found);
        assert!(found[0].offset < found[1].offset);
        assert_eq!(found[1].matched, "Item 2. Management's Discussion and Analysis");
        assert!(found[1].confidence > found[0].confidence);
    }

    #[test]
    fn test_parenthetical_cross_reference_is_downgraded() {
        let text = "Demand may fall (see Item 1A, Risk Factors) in later periods.";
        let found = candidates(text, SectionType::RiskFactors);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].context, MatchContext::CrossReference);
        assert!(found[0].confidence < 0.3);
    }

    #[test]
    fn test_reference_lead_in_is_downgraded() {
        let text = "These matters are discussed in Part II, Item 1. Legal Proceedings of this report.";
        let found = candidates(text, SectionType::LegalProceedings);
        assert_eq!(found[0].context, MatchContext::CrossReference);
    }

    #[test]
    fn test_toc_line_is_downgraded() {
        let text = "TABLE OF CONTENTS\nItem 1A. Risk Factors ........ 12\nItem 2. Properties 14\n";
        let found = candidates(text, SectionType::RiskFactors);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].context, MatchContext::TableOfContents);
        assert!((found[0].confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_prose_mention_is_weak() {
        let text = "We describe several risk factors below that could hurt results.";
        let found = candidates(text, SectionType::RiskFactors);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].context, MatchContext::Inline);
        assert!(found[0].confidence < 0.5);
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(candidates("Nothing relevant in here.", SectionType::MarketRisk).is_empty());
    }

    #[test]
    fn test_wrapped_reference_is_downgraded() {
        let text = "Our exposure is described in greater detail in\nItem 1A. Risk Factors\nand elsewhere.";
        let found = candidates(text, SectionType::RiskFactors);
        assert_eq!(found[0].context, MatchContext::CrossReference);

        let text = "Demand softened.\nItem 1A. Risk Factors of our Annual Report on Form 10-K for fiscal 2023.\n";
        let found = candidates(text, SectionType::RiskFactors);
        assert_eq!(found[0].context, MatchContext::CrossReference);
    }

    #[test]
    fn test_reference_line_detection() {
        let text = "Revenue grew.\nItem 1A. Risk Factors of our Annual Report on Form 10-K.\nItem 4. Controls and Procedures\nSee the discussion in\nItem 2. Properties\n";
        let line = |needle: &str| {
            let start = text.find(needle).unwrap();
            (start, start + text[start..].find('\n').unwrap())
        };
        let (s, e) = line("Item 1A.");
        assert!(is_reference_line(text, s, e));
        let (s, e) = line("Item 4.");
        assert!(!is_reference_line(text, s, e));
        let (s, e) = line("Item 2.");
        assert!(is_reference_line(text, s, e));
    }

    #[test]
    fn test_toc_tail_detection() {
        assert!(is_toc_tail(" ........ 12"));
        assert!(is_toc_tail(" of Financial Condition and Results of Operations 23"));
        assert!(!is_toc_tail(""));
        assert!(!is_toc_tail(" for fiscal 2023"));
    }
}
