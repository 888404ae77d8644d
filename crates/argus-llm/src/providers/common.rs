//! Common utilities shared across LLM providers.

use crate::error::{LlmError, Result};
use reqwest::Client;
use std::time::Duration;

/// Build a standard HTTP client with common timeout settings.
///
/// # Arguments
/// * `timeout_secs` - Timeout in seconds (defaults to 60 if not specified)
///
/// # Errors
/// Returns error if the HTTP client cannot be created.
pub fn build_http_client(timeout_secs: Option<u64>) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs.unwrap_or(60)))
        .build()
        .map_err(|e| LlmError::Internal(format!("failed to create HTTP client: {e}")))
}

/// Truncate an error body for logging without splitting a UTF-8 character.
#[must_use]
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}
