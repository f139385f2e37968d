//! Error types for completion providers.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when talking to a completion provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid response from provider.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// General provider error.
    #[error("Provider error: {0}")]
    ProviderError(String),
}

impl LlmError {
    /// Check if this error is due to authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationError(_) | LlmError::ApiKeyNotFound(_)
        )
    }
}

/// Convert provider errors into the engine's failure classes.
///
/// Auth problems will not fix themselves on retry and abort the run;
/// everything else (rate limits, 5xx, network, malformed bodies) is a
/// transient failure the scheduler's retry policy can take.
impl From<LlmError> for engine::EngineError {
    fn from(err: LlmError) -> Self {
        if err.is_auth_error() {
            engine::EngineError::Config(err.to_string())
        } else {
            engine::EngineError::Transient(err.to_string())
        }
    }
}
