//! Completion-provider implementations for notefill.
//!
//! This crate provides concrete implementations of the `CompletionModel`
//! trait from `engine` for remote LLM providers:
//!
//! - **Claude** - Anthropic's messages API
//! - **OpenAI** - the chat-completions API, including OpenAI-compatible
//!   servers reachable at a custom base URL
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::ClaudeClient;
//! use llm::config::RemoteLlmConfig;
//! use engine::{CompletionModel, CompletionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env("ANTHROPIC_API_KEY", "https://api.anthropic.com")?;
//!     let client = ClaudeClient::new(config)?;
//!
//!     let response = client
//!         .complete(CompletionRequest {
//!             model: "claude-3-5-haiku-latest".into(),
//!             prompt: "What is Rust?".into(),
//!             temperature: 1.0,
//!             max_tokens: Some(512),
//!         })
//!         .await?;
//!     println!("{}", response.text);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod remote;

// Re-export commonly used types
pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use remote::{ClaudeClient, OpenAiClient};

/// Known provider kinds selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Claude,
    OpenAi,
}

impl ProviderKind {
    /// Parse a provider name as written in preferences or flags.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Some(ProviderKind::Claude),
            "openai" | "gpt" => Some(ProviderKind::OpenAi),
            _ => None,
        }
    }

    /// Default API base URL for the provider.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "https://api.anthropic.com",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
        }
    }

    /// Environment variable conventionally holding the API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Build a boxed client for this provider.
    pub fn build(
        &self,
        config: RemoteLlmConfig,
    ) -> Result<std::sync::Arc<dyn engine::CompletionModel>> {
        Ok(match self {
            ProviderKind::Claude => std::sync::Arc::new(ClaudeClient::new(config)?),
            ProviderKind::OpenAi => std::sync::Arc::new(OpenAiClient::new(config)?),
        })
    }
}
