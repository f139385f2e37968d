//! Completion-client contract.
//!
//! The engine is provider-agnostic: it drives anything implementing
//! [`CompletionModel`]. Concrete providers (Claude, OpenAI-compatible
//! servers) live in the `llm` crate; tests use in-process fakes.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier, passed through verbatim to the provider.
    pub model: String,
    /// The fully rendered prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Optional cap on output tokens.
    pub max_tokens: Option<usize>,
}

/// Token counts reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl UsageMetadata {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// One completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The raw completion text.
    pub text: String,
    /// Usage counts, when the provider reports them.
    pub usage: Option<UsageMetadata>,
}

/// A chat-completion backend.
///
/// Implementations must be `Send + Sync`; the scheduler shares one instance
/// across all in-flight rows via `Arc<dyn CompletionModel>`. Provider-side
/// failures should surface as [`crate::EngineError::Transient`] so the retry
/// policy can take them, except auth/config problems which are fatal.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Issue one completion call.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
