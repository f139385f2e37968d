//! Error types for the row-processing engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while processing a row set.
///
/// The scheduler's retry loop consumes [`EngineError::is_retryable`] directly:
/// retryable errors are re-attempted up to the configured count and then
/// recorded against the row, everything else aborts the run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Pre-flight validation failed; nothing was scheduled.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad template or row data. Not retryable, aborts the whole run.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient provider or response failure. Retried per policy.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Completion call exceeded its wall-clock budget. Retried per policy.
    #[error("Request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// Failed to encode or durably write output. Fatal for the run.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl EngineError {
    /// Check if this error is worth another attempt at the same row.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Transient(_) | EngineError::Timeout { .. })
    }

    /// Check if this error must abort the entire run.
    ///
    /// Everything that is not retryable aborts: validation and configuration
    /// problems will not fix themselves on a second attempt, and a failed
    /// output write means durability can no longer be guaranteed.
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}
