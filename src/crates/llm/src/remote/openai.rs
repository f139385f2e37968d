//! OpenAI-compatible chat-completions client.
//!
//! Speaks the `/chat/completions` dialect, which also covers the many
//! providers exposing an OpenAI-compatible endpoint.

use crate::config::RemoteLlmConfig;
use crate::error::LlmError;
use async_trait::async_trait;
use engine::{CompletionModel, CompletionRequest, CompletionResponse, UsageMetadata};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// OpenAI chat-completions API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::HttpError)?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> engine::Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(model = %request.model, "Dispatching OpenAI completion");

        let req_body = OpenAiApiRequest {
            model: request.model.clone(),
            messages: vec![OpenAiMessage {
                role: "user".to_string(),
                content: request.prompt,
            }],
            temperature: Some(request.temperature),
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
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
                LlmError::ProviderError(format!("OpenAI API error {}: {}", status, error_text))
            }
            .into());
        }

        let api_resp: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = api_resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".into()))?;

        let usage = api_resp
            .usage
            .map(|u| UsageMetadata::new(u.prompt_tokens, u.completion_tokens));

        Ok(CompletionResponse { text, usage })
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAiApiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let config = RemoteLlmConfig::new("test-key", "https://api.openai.com/v1");
        assert!(OpenAiClient::new(config).is_ok());
    }

    #[test]
    fn test_request_serialization_skips_absent_caps() {
        let req = OpenAiApiRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![OpenAiMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            temperature: Some(0.7),
            max_tokens: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("max_tokens"));
        assert!(json.contains("\"temperature\":0.7"));
    }
}
