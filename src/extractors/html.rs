// src/extractors/html.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, ElementRef, Html};

// Elements whose text never belongs to the filing body
const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "head", "noscript", "template"];

// Elements that start a new line of text
const BLOCK_ELEMENTS: [&str; 20] = [
    "p", "div", "br", "tr", "table", "li", "ul", "ol", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "center", "blockquote", "pre",
];

const CELL_ELEMENTS: [&str; 2] = ["td", "th"];

// --- Whitespace cleanup (Lazy Static) ---
static INLINE_SPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t\u{a0}\u{2007}\u{202f}\u{200b}\r\f\v]+").expect("Failed to compile INLINE_SPACE_RE")
});

static BLANK_RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").expect("Failed to compile BLANK_RUN_RE")
});

static HTML_SNIFF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:<\?xml[^>]*>\s*)?(?:<!doctype\s+html|<html\b|<xbrl|<document>|<body\b|<div\b|<p\b)")
        .expect("Failed to compile HTML_SNIFF_RE")
});

/// True when the text looks like an HTML (or inline XBRL) filing rather than plain text.
pub fn looks_like_html(text: &str) -> bool {
    HTML_SNIFF_RE.is_match(text)
}

/// Flattens an HTML filing into plain text. Block elements become line breaks,
/// so headings end up on their own lines the way the matcher expects.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::with_capacity(html.len() / 3);
    collect_text(document.root_element(), &mut raw);

    let lines: Vec<String> = raw
        .lines()
        .map(|line| INLINE_SPACE_RE.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    let text = BLANK_RUN_RE.replace_all(&joined, "\n\n").trim().to_string();
    tracing::debug!("Converted {} bytes of HTML into {} bytes of text", html.len(), text.len());
    text
}

fn collect_text(element: ElementRef, out: &mut String) {
    let name = element.value().name();
    if SKIPPED_ELEMENTS.contains(&name) {
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        out.push('\n');
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text_node) => out.push_str(&text_node.text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {} // Comments, doctype, processing instructions
        }
    }

    if block {
        out.push('\n');
    } else if CELL_ELEMENTS.contains(&name) {
        out.push(' ');
    }
}
