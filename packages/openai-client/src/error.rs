//! Error types for the OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// Non-success API response, with the payload's embedded message
    #[error("{status} - {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("parse error: {0}")]
    Parse(String),
}
