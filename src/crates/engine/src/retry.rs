//! Per-row retry with exponential backoff.

use crate::error::{EngineError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Backoff settings for re-attempting transient failures.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first.
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,

    /// Multiplier between attempts (typically 2.0).
    pub backoff_multiplier: f64,

    /// Whether to add random jitter to backoff delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    pub fn with_initial_backoff(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    pub fn with_max_backoff(mut self, ms: u64) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff delay before the attempt following `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = (self.initial_backoff_ms as f64
            * self.backoff_multiplier.powi(attempt as i32)) as u64;

        let delay_ms = delay_ms.min(self.max_backoff_ms);

        let delay_ms = if self.jitter {
            // Up to 25% random jitter.
            let jitter_amount = (delay_ms as f64 * 0.25 * rand::random::<f64>()) as u64;
            delay_ms + jitter_amount
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms)
    }
}

/// Run one row's attempt closure under the retry policy.
///
/// Retryable errors ([`EngineError::is_retryable`]) are re-attempted up to
/// `max_retries` additional times with backoff in between; the last one is
/// returned when attempts run out. Fatal errors short-circuit immediately so
/// the scheduler can abort the run.
pub async fn retry_row<F, Fut, T>(config: &RetryConfig, row_id: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            info!(
                row_id = row_id,
                attempt = attempt,
                max_retries = config.max_retries,
                "Retrying row"
            );
        }

        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(row_id = row_id, attempt = attempt, "Row succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                debug!(
                    row_id = row_id,
                    attempt = attempt,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Row attempt failed"
                );

                if !e.is_retryable() {
                    error!(row_id = row_id, error = %e, "Fatal error, aborting retries");
                    return Err(e);
                }

                last_error = Some(e);

                if attempt < config.max_retries {
                    let delay = config.backoff_delay(attempt);
                    warn!(
                        row_id = row_id,
                        attempt = attempt,
                        remaining = config.max_retries - attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient error, will retry after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    let final_error = last_error.unwrap_or_else(|| {
        EngineError::Transient(format!(
            "row {} failed after {} retries",
            row_id, config.max_retries
        ))
    });

    error!(
        row_id = row_id,
        max_retries = config.max_retries,
        error = %final_error,
        "All retry attempts exhausted"
    );

    Err(final_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_backoff_delay_exponential() {
        let config = RetryConfig::new(3).with_jitter(false);
        assert_eq!(config.backoff_delay(0).as_millis(), 1000);
        assert_eq!(config.backoff_delay(1).as_millis(), 2000);
        assert_eq!(config.backoff_delay(2).as_millis(), 4000);
    }

    #[test]
    fn test_backoff_delay_ceiling() {
        let config = RetryConfig::new(10).with_jitter(false);
        // 1000 * 2^8 = 256000 without the cap.
        assert_eq!(config.backoff_delay(8).as_millis(), 30_000);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let config = RetryConfig::new(3);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = retry_row(&config, "1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, EngineError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_errors() {
        let config = RetryConfig::new(3).with_initial_backoff(5).with_jitter(false);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = retry_row(&config, "1", move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(EngineError::Transient("503".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_short_circuits() {
        let config = RetryConfig::new(3).with_initial_backoff(5);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<()> = retry_row(&config, "1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::Config("missing placeholder".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(EngineError::Config(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let config = RetryConfig::new(2).with_initial_backoff(5).with_jitter(false);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<()> = retry_row(&config, "1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::Timeout { secs: 60 })
            }
        })
        .await;

        assert!(matches!(result, Err(EngineError::Timeout { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
