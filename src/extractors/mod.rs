// src/extractors/mod.rs
pub mod boundary;
pub mod chunk;
pub mod config;
pub mod html;
pub mod matcher;
pub mod overlap;
pub mod patterns;
pub mod ranker;
pub mod section;
pub mod types;
pub mod validator;

// Re-export key extraction types for convenience
pub use chunk::{split_into_parts, SectionPart};
pub use config::{ConflictPreference, CustomPattern, ExtractionConfig};
pub use html::html_to_text;
pub use section::SectionExtractor;
pub use types::{Candidate, Diagnostic, Document, ExtractionResult, FormType, Section, SectionType};
