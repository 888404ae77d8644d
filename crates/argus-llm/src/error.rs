//! Error types for the LLM subsystem.

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transient quota exhaustion (tokens per minute, model overloaded)
    #[error("per-minute quota exceeded for {provider}: {message}")]
    QuotaPerMinute {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Daily quota exhausted; no further calls will succeed this run
    #[error("daily quota exhausted for {provider}: {message}")]
    QuotaPerDay {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// API error with status code
    #[error("API error ({provider}): status {status}, {message}")]
    ApiError {
        /// Provider name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Invalid API key or authentication failure
    #[error("authentication failed for {provider}: {message}")]
    AuthenticationFailed {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Response parsing error
    #[error("failed to parse response from {provider}: {message}")]
    ParseError {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// Whether waiting for the quota window to pass may let the call succeed.
    #[must_use]
    pub fn is_transient_quota(&self) -> bool {
        matches!(self, Self::QuotaPerMinute { .. })
    }
}

/// Result type alias for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;
