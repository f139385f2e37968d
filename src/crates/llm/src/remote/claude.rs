//! Anthropic Claude client implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::ClaudeClient;
//! use llm::config::RemoteLlmConfig;
//! use engine::{CompletionModel, CompletionRequest};
//!
//! let config = RemoteLlmConfig::from_env("ANTHROPIC_API_KEY", "https://api.anthropic.com")?;
//! let client = ClaudeClient::new(config)?;
//!
//! let response = client.complete(CompletionRequest {
//!     model: "claude-3-5-haiku-latest".into(),
//!     prompt: "Say hello".into(),
//!     temperature: 1.0,
//!     max_tokens: None,
//! }).await?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use engine::{CompletionModel, CompletionRequest, CompletionResponse, UsageMetadata};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

const DEFAULT_MAX_TOKENS: usize = 4096;

/// Anthropic messages API client.
#[derive(Clone)]
pub struct ClaudeClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl ClaudeClient {
    /// Create a new Claude client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::HttpError)?;

        Ok(Self { config, client })
    }

    fn convert_response(&self, resp: ClaudeResponse) -> CompletionResponse {
        let text = resp
            .content
            .iter()
            .filter_map(|c| {
                if c.content_type == "text" {
                    c.text.clone()
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        CompletionResponse {
            text,
            usage: Some(UsageMetadata::new(
                resp.usage.input_tokens,
                resp.usage.output_tokens,
            )),
        }
    }
}

#[async_trait]
impl CompletionModel for ClaudeClient {
    async fn complete(&self, request: CompletionRequest) -> engine::Result<CompletionResponse> {
        let url = format!("{}/v1/messages", self.config.base_url);
        tracing::debug!(model = %request.model, "Dispatching Claude completion");

        let req_body = ClaudeApiRequest {
            model: request.model.clone(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: Some(request.temperature),
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&req_body)
            .send()
            .await
            .map_err(LlmError::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(if status.as_u16() == 401 {
                LlmError::AuthenticationError(error_text)
            } else if status.as_u16() == 429 {
                LlmError::RateLimitExceeded(error_text)
            } else {
                LlmError::ProviderError(format!("Claude API error {}: {}", status, error_text))
            }
            .into());
        }

        let claude_resp: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(self.convert_response(claude_resp))
    }
}

// Claude API types
#[derive(Debug, Serialize)]
struct ClaudeApiRequest {
    model: String,
    messages: Vec<ClaudeMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u64,
    output_tokens: u64,
}
