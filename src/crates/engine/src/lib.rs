//! # Engine - concurrent resumable row processing
//!
//! The core of notefill: a scheduler that bulk-applies an LLM completion
//! service to a batch of records ("rows"), writing each result back to
//! durable storage with crash-safety and resumability.
//!
//! ## Features
//!
//! - **Bounded concurrency** - a semaphore caps in-flight completion calls
//! - **Retry with backoff** - transient failures re-attempted per row,
//!   exponential backoff with floor, ceiling, and jitter
//! - **Failure-class discrimination** - configuration errors abort the run,
//!   transient exhaustion is recorded per row without disturbing siblings
//! - **Crash-safe persistence** - incremental flushes written atomically
//!   (temp file + rename), so a valid output file exists at every boundary
//! - **Resume** - rows with a prior error-free result are skipped
//! - **Live accounting** - shared token counter and per-model price table
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use engine::{MergeMode, Row, RunConfig, Scheduler, Template};
//! use std::sync::Arc;
//!
//! # async fn example(model: Arc<dyn engine::CompletionModel>) -> engine::Result<()> {
//! let rows = engine::read_rows("deck.json".as_ref())?;
//! let template = Template::new("Translate to Japanese: {English}");
//! let config = RunConfig::new(
//!     "claude-3-5-haiku-latest",
//!     MergeMode::SingleField("Japanese".into()),
//! )
//! .with_concurrency(8);
//!
//! let outcome = Scheduler::new(model, config)
//!     .run(rows, &template, None)
//!     .await?;
//! println!("{} tokens", outcome.stats.total_tokens());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod executor;
pub mod interpret;
pub mod llm;
pub mod persist;
pub mod retry;
pub mod row;
pub mod scheduler;
pub mod stats;
pub mod template;

// Error types and utilities
mod error;

// Re-export key types for convenience
pub use codec::{read_rows, RowFormat};
pub use config::RunConfig;
pub use error::{EngineError, Result};
pub use executor::PROMPT_KEY;
pub use interpret::MergeMode;
pub use llm::{CompletionModel, CompletionRequest, CompletionResponse, UsageMetadata};
pub use persist::OutputStore;
pub use retry::RetryConfig;
pub use row::{validate_unique_ids, Row, ERROR_KEY, ID_KEYS};
pub use scheduler::{ProgressFn, ProgressUpdate, RunOutcome, Scheduler};
pub use stats::{FailureDetail, ModelPrice, PriceTable, RunSummary, TokenStats};
pub use template::Template;
