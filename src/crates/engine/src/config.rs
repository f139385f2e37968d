//! Run configuration.

use crate::error::{EngineError, Result};
use crate::interpret::MergeMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable settings for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Model identifier passed through to the completion provider.
    pub model: String,

    /// How completion results are applied to rows.
    pub merge_mode: MergeMode,

    /// Maximum number of rows in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Additional attempts after the first, per row.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Require a `<result>...</result>` region in the completion text.
    #[serde(default)]
    pub require_result_tag: bool,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Optional cap on output tokens per call.
    pub max_tokens: Option<usize>,

    /// Render prompts without calling the provider.
    #[serde(default)]
    pub dry_run: bool,

    /// Wall-clock budget for a single completion call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

impl RunConfig {
    pub fn new(model: impl Into<String>, merge_mode: MergeMode) -> Self {
        Self {
            model: model.into(),
            merge_mode,
            concurrency: default_concurrency(),
            retries: default_retries(),
            require_result_tag: false,
            temperature: default_temperature(),
            max_tokens: None,
            dry_run: false,
            request_timeout: default_request_timeout(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_require_result_tag(mut self, require: bool) -> Self {
        self.require_result_tag = require;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate once at entry; an invalid config is a pre-flight fatal.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(EngineError::Validation("model must not be empty".into()));
        }
        if self.concurrency < 1 {
            return Err(EngineError::Validation(
                "concurrency must be at least 1".into(),
            ));
        }
        if let MergeMode::SingleField(name) = &self.merge_mode {
            if name.trim().is_empty() {
                return Err(EngineError::Validation(
                    "target field name must not be empty".into(),
                ));
            }
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(EngineError::Validation(format!(
                "temperature {} out of range [0, 2]",
                self.temperature
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(EngineError::Validation(
                "request timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

fn default_concurrency() -> usize {
    5
}

fn default_retries() -> u32 {
    3
}

fn default_temperature() -> f32 {
    1.0
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = RunConfig::new("claude-3-5-haiku-latest", MergeMode::StructuredMerge);
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.retries, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_concurrency() {
        let config = RunConfig::new("m", MergeMode::StructuredMerge).with_concurrency(0);
        assert!(matches!(
            config.validate(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_single_field() {
        let config = RunConfig::new("m", MergeMode::SingleField("  ".into()));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_temperature() {
        let config = RunConfig::new("m", MergeMode::StructuredMerge).with_temperature(3.5);
        assert!(config.validate().is_err());
    }
}
