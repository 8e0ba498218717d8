//! Error types for issue trackers

use thiserror::Error;

/// Errors that can occur while talking to an issue tracker
#[derive(Error, Debug)]
pub enum TrackerError {
    /// No backend is registered under the requested name
    #[error("Unsupported project management tool: {requested}. Supported tools are: {supported}")]
    Unsupported {
        /// Name that was asked for
        requested: String,
        /// Comma-separated registered names
        supported: String,
    },

    /// Transport-level failure
    #[error("Tracker communication error: {0}")]
    Communication(String),

    /// The backend answered with an error status
    #[error("Tracker API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or summary
        message: String,
    },

    /// The backend answered with something unexpected
    #[error("Invalid tracker response: {0}")]
    InvalidResponse(String),

    /// Backend misconfiguration
    #[error("Tracker configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TrackerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TrackerError::InvalidResponse(e.to_string())
        } else {
            TrackerError::Communication(e.to_string())
        }
    }
}
