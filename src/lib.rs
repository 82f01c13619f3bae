// src/lib.rs
//! Section-boundary extraction for SEC periodic filings (10-K, 10-Q, 8-K).
//!
//! The core is [`extractors::SectionExtractor`]: a pure function of document
//! text, form type and [`extractors::ExtractionConfig`]. Acquisition (EDGAR,
//! local files), storage and reporting sit around it.
pub mod batch;
pub mod edgar;
pub mod extractors;
pub mod input;
pub mod report;
pub mod storage;
pub mod utils;

pub use extractors::{Document, ExtractionConfig, ExtractionResult, FormType, SectionExtractor, SectionType};
pub use utils::error::{AppError, EdgarError, ExtractError, StorageError};
