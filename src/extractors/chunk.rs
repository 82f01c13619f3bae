// src/extractors/chunk.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::extractors::types::{count_words, Section};

static PARAGRAPH_BREAK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t]*\n\s*").expect("Failed to compile PARAGRAPH_BREAK_RE")
});

/// A slice of a long section, kept on paragraph boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionPart {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub word_count: usize,
}

/// Splits a section into consecutive parts of at most `max_words` words.
/// Paragraphs are never split; an oversized paragraph becomes its own part.
pub fn split_into_parts(text: &str, section: &Section, max_words: usize) -> Vec<SectionPart> {
    let whole = SectionPart { index: 0, start: section.start, end: section.end, word_count: section.word_count };
    if max_words == 0 || section.word_count <= max_words {
        return vec![whole];
    }
    let Some(body) = text.get(section.start..section.end) else {
        return vec![whole];
    };

    // Paragraph spans, absolute offsets
    let mut paragraphs = Vec::new();
    let mut cursor = 0;
    for brk in PARAGRAPH_BREAK_RE.find_iter(body) {
        paragraphs.push((section.start + cursor, section.start + brk.start()));
        cursor = brk.end();
    }
    paragraphs.push((section.start + cursor, section.end));

    let mut parts: Vec<SectionPart> = Vec::new();
    let mut current: Option<SectionPart> = None;
    for (start, end) in paragraphs {
        let words = count_words(&text[start..end]);
        if words == 0 {
            continue;
        }
        match current.as_mut() {
            Some(part) if part.word_count + words <= max_words => {
                part.end = end;
                part.word_count += words;
            }
            _ => {
                if let Some(done) = current.take() {
                    parts.push(done);
                }
                current = Some(SectionPart { index: parts.len(), start, end, word_count: words });
            }
        }
    }
    if let Some(done) = current {
        parts.push(done);
    }

    if parts.len() > 1 {
        parts
    } else {
        vec![whole]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::types::SectionType;

    fn section_over(text: &str) -> Section {
        Section {
            section_type: SectionType::ManagementDiscussion,
            start: 0,
            end: text.len(),
            word_count: count_words(text),
            confidence: 1.0,
            heading: String::new(),
        }
    }

    #[test]
    fn test_short_section_is_single_part() {
        let text = "one two three\n\nfour five";
        let parts = split_into_parts(text, &section_over(text), 10);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].word_count, 5);
    }

    #[test]
    fn test_paragraphs_grouped_under_limit() {
        let para = "word ".repeat(40);
        let text = format!("{p}\n\n{p}\n\n{p}", p = para.trim_end());
        let parts = split_into_parts(&text, &section_over(&text), 90);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].word_count, 80);
        assert_eq!(parts[1].word_count, 40);
        assert_eq!(parts[1].index, 1);
        assert!(parts[0].end <= parts[1].start);
        assert!(text[parts[1].start..parts[1].end].starts_with("word"));
    }

    #[test]
    fn test_oversized_paragraph_stands_alone() {
        let text = format!("{}\n\n{}", "big ".repeat(50).trim_end(), "small ".repeat(5).trim_end());
        let parts = split_into_parts(&text, &section_over(&text), 20);
        assert_eq!(parts.iter().map(|p| p.word_count).collect::<Vec<_>>(), vec![50, 5]);
    }
}
