//! Google Gemini API provider implementation.

use crate::error::{LlmError, Result};
use crate::provider::{CompletionRequest, CompletionResponse, LlmProvider, Usage};
use crate::providers::common::{build_http_client, truncate_for_log};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const PROVIDER: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini API provider.
///
/// Calls `generateContent` with the system prompt sent as
/// `system_instruction` and the page body as the single user turn.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given API key.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_model(api_key, "gemini-2.0-flash-lite")
    }

    /// Create a new Gemini provider with a specific model.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            client: build_http_client(Some(60))?,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    /// Point the provider at a different endpoint (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Model this provider calls.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The key travels in `x-goog-api-key`, never in the URL, so transport
    /// errors that echo the request URL cannot leak it.
    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Convert internal request to Gemini API format.
    fn to_api_request(request: &CompletionRequest) -> GeminiRequest {
        let system_instruction = request.system_prompt.as_ref().map(|prompt| GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: Some(prompt.clone()),
            }],
        });

        let generation_config = if request.temperature.is_some() || request.max_tokens.is_some()
        {
            Some(GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            })
        } else {
            None
        };

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(request.content.clone()),
                }],
            }],
            system_instruction,
            generation_config,
        }
    }

    /// Convert Gemini API response to internal format.
    fn convert_api_response(&self, response: GeminiResponse) -> Result<CompletionResponse> {
        let candidate =
            response
                .candidates
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::ParseError {
                    provider: PROVIDER.to_string(),
                    message: "no candidates in response".to_string(),
                })?;

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: text,
            model: response
                .model_version
                .unwrap_or_else(|| self.model.clone()),
            usage: response.usage_metadata.map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            }),
        })
    }
}

/// Map a non-success response onto the error taxonomy the oracle acts on.
///
/// Gemini reports quota exhaustion as HTTP 429 `RESOURCE_EXHAUSTED` and
/// names the violated quota (e.g. `...InputTokensPerModelPerDay`) in the body.
pub(crate) fn classify_error(status: StatusCode, body: &str) -> LlmError {
    let message = truncate_for_log(body, 500);

    if body.contains("PerDay") {
        return LlmError::QuotaPerDay {
            provider: PROVIDER.to_string(),
            message,
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::SERVICE_UNAVAILABLE
        || body.contains("PerMinute")
        || body.contains("overloaded")
    {
        return LlmError::QuotaPerMinute {
            provider: PROVIDER.to_string(),
            message,
        };
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return LlmError::AuthenticationFailed {
            provider: PROVIDER.to_string(),
            message,
        };
    }

    LlmError::ApiError {
        provider: PROVIDER.to_string(),
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let api_request = Self::to_api_request(&request);

        debug!(model = %self.model, "sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::from(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = classify_error(status, &body);
            warn!(status = %status, error = %err, "Gemini request failed");
            return Err(err);
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::from(e.without_url()))?;
        self.convert_api_response(api_response)
    }

    fn provider_id(&self) -> &'static str {
        PROVIDER
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)]
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}
