//! Core LLM provider trait and request/response types.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for LLM providers answering a single prompt.
///
/// Provider implementations must be thread-safe (Send + Sync) since every
/// scan worker shares one instance.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt with a single response.
    ///
    /// # Errors
    /// Returns error if the provider fails, a quota is hit, network issues
    /// occur, or response parsing fails.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the unique identifier for this provider.
    fn provider_id(&self) -> &str;
}

/// Request for LLM completion: a system instruction plus one user text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System instruction (the verification prompt)
    pub system_prompt: Option<String>,

    /// User content (the page body)
    pub content: String,

    /// Temperature for sampling (0.0 = deterministic)
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// Create a new completion request with the given user content.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            content: content.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens to generate.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from LLM completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: Option<Usage>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Input tokens consumed
    pub input_tokens: u32,

    /// Output tokens generated
    pub output_tokens: u32,

    /// Total billed tokens as reported by the provider
    pub total_tokens: u32,
}

impl Usage {
    /// Total tokens, falling back to input + output when the provider did
    /// not report a total.
    #[must_use]
    pub fn total(&self) -> u64 {
        if self.total_tokens > 0 {
            u64::from(self.total_tokens)
        } else {
            u64::from(self.input_tokens) + u64::from(self.output_tokens)
        }
    }
}
