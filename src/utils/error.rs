// src/utils/error.rs
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode),

    #[error("SEC Rate limit likely exceeded")]
    RateLimited,

    #[error("Could not find specified filing: {0}")]
    FilingDocNotFound(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum ExtractError {
    /// Empty, binary or otherwise undecodable document text.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid heading pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid extraction config: {0}")]
    InvalidConfig(String),

    #[error("Extraction worker failed: {0}")]
    Worker(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_keeps_source() {
        let source = regex::Regex::new("(unclosed").unwrap_err();
        let err = ExtractError::InvalidPattern { pattern: "(unclosed".to_string(), source };
        assert!(err.to_string().starts_with("Invalid heading pattern '(unclosed'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_errors_convert_into_app_error() {
        let app: AppError = ExtractError::MalformedInput("empty".to_string()).into();
        assert!(matches!(app, AppError::Extraction(ExtractError::MalformedInput(_))));
    }
}
