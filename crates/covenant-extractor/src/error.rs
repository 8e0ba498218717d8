//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur during extraction
///
/// `Llm`, `InvalidFormat` and `JsonParse` describe a single failed attempt at
/// one chunk; the chunk processor absorbs them. Only `Config` and
/// `TaskJoin` ever reach the caller of a run.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Response does not match the expected schema
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A chunk task panicked or was cancelled
    #[error("Chunk task failed: {0}")]
    TaskJoin(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}
