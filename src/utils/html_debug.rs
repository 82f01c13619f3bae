// src/utils/html_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::extractors::types::{Candidate, ExtractionResult, MatchContext};
use crate::utils::error::AppError;

const DEBUG_STYLE: &str = "\
body { font-family: monospace; white-space: pre-wrap; }
.highlight-selected { background-color: #90EE90; font-weight: bold; }
.highlight-candidate { background-color: #FFFF00; }
.highlight-toc { background-color: #ADD8E6; }
.highlight-xref { background-color: #FFC0CB; }
.section-end { border-top: 2px dashed #FFA500; display: block; }
";

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn css_class(candidate: &Candidate, selected: bool) -> &'static str {
    if selected {
        return "highlight-selected";
    }
    match candidate.context {
        MatchContext::TableOfContents => "highlight-toc",
        MatchContext::CrossReference => "highlight-xref",
        MatchContext::Heading | MatchContext::Inline => "highlight-candidate",
    }
}

/// Renders the plain text with every heading candidate highlighted. Selected
/// starts are green; section ends are marked with a dashed rule.
pub fn render_debug_html(text: &str, candidates: &[Candidate], result: &ExtractionResult) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
    html.push_str(DEBUG_STYLE);
    html.push_str("</style>\n</head>\n<body>\n");

    let mut sorted: Vec<&Candidate> = candidates.iter().collect();
    sorted.sort_by_key(|c| c.offset);
    let mut ends: Vec<usize> = result.sections.iter().map(|s| s.end).collect();
    ends.sort_unstable();
    let mut ends = ends.into_iter().peekable();

    let mut last_pos = 0;
    for candidate in sorted {
        let (start, end) = (candidate.offset, candidate.heading_end());
        // Candidates of different section types can share text
        if start < last_pos || end > text.len() {
            continue;
        }
        while let Some(section_end) = ends.next_if(|&e| e <= start) {
            html.push_str(&escape(&text[last_pos..section_end]));
            html.push_str("<span class=\"section-end\"></span>");
            last_pos = section_end;
        }

        let selected = result
            .sections
            .iter()
            .any(|s| s.start == start && s.section_type == candidate.section_type);
        html.push_str(&escape(&text[last_pos..start]));
        html.push_str(&format!(
            "<span class=\"{}\" title=\"{:?} | {:?} | {:.3} | {}-{}\">",
            css_class(candidate, selected),
            candidate.section_type,
            candidate.context,
            candidate.confidence,
            start,
            end
        ));
        html.push_str(&escape(&text[start..end]));
        html.push_str("</span>");
        last_pos = end;
    }

    for section_end in ends {
        if section_end >= last_pos && section_end <= text.len() {
            html.push_str(&escape(&text[last_pos..section_end]));
            html.push_str("<span class=\"section-end\"></span>");
            last_pos = section_end;
        }
    }
    html.push_str(&escape(&text[last_pos..]));
    html.push_str("\n</body>\n</html>");
    html
}

/// Writes the annotated document to `path`.
pub fn save_debug_html<P: AsRef<Path>>(
    path: P,
    text: &str,
    candidates: &[Candidate],
    result: &ExtractionResult,
) -> Result<(), AppError> {
    let path = path.as_ref();
    let mut file = File::create(path)?;
    file.write_all(render_debug_html(text, candidates, result).as_bytes())?;
    tracing::info!("Saved debug HTML to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::types::{FormType, Section, SectionType};

    fn candidate(offset: usize, matched: &str, context: MatchContext) -> Candidate {
        Candidate {
            section_type: SectionType::RiskFactors,
            offset,
            matched: matched.to_string(),
            confidence: 0.5,
            context,
        }
    }

    #[test]
    fn test_render_marks_selected_and_toc() {
        let text = "Risk Factors 3\n<body> Risk Factors\nwords";
        let heading = text.rfind("Risk Factors").unwrap();
        let result = ExtractionResult {
            document_id: "d".to_string(),
            form_type: FormType::TenK,
            total_words: 6,
            sections: vec![Section {
                section_type: SectionType::RiskFactors,
                start: heading,
                end: text.len(),
                word_count: 3,
                confidence: 1.0,
                heading: "Risk Factors".to_string(),
            }],
            diagnostics: vec![],
            coverage: 0.5,
        };
        let candidates = vec![
            candidate(0, "Risk Factors", MatchContext::TableOfContents),
            candidate(heading, "Risk Factors", MatchContext::Heading),
        ];
        let html = render_debug_html(text, &candidates, &result);
        assert!(html.contains("<span class=\"highlight-toc\""));
        assert!(html.contains("<span class=\"highlight-selected\""));
        assert!(html.contains("&lt;body&gt;"), "Document text is escaped");
        assert!(html.contains("words<span class=\"section-end\"></span>"));
    }
}
