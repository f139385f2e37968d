//! Concurrent run scheduling.
//!
//! The scheduler fans rows out to executors under a semaphore-bounded
//! concurrency cap, wraps each row in the retry policy, discriminates fatal
//! from recoverable failures, and feeds finalized rows to the persistence
//! store and the progress callback. Results land in a pre-sized,
//! index-addressed array so final ordering always mirrors input ordering,
//! whatever order completions arrive in.

use crate::config::RunConfig;
use crate::error::Result;
use crate::executor::execute_row;
use crate::llm::CompletionModel;
use crate::persist::OutputStore;
use crate::retry::{retry_row, RetryConfig};
use crate::row::{validate_unique_ids, Row};
use crate::stats::{shared_token_stats, snapshot, PriceTable, RunSummary, TokenStats};
use crate::template::Template;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Live progress for one run, emitted after every finalized row.
#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stats: TokenStats,
    pub cost: f64,
}

/// Progress callback shared with the display layer.
pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Everything a finished run hands back to the caller.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// One processed row per input row, in input order.
    pub rows: Vec<Row>,
    /// Final token totals.
    pub stats: TokenStats,
    /// Full accounting for display.
    pub summary: RunSummary,
}

/// Drives a batch of rows through completion calls.
pub struct Scheduler {
    model: Arc<dyn CompletionModel>,
    config: Arc<RunConfig>,
    retry: RetryConfig,
    prices: PriceTable,
    progress: Option<ProgressFn>,
}

impl Scheduler {
    pub fn new(model: Arc<dyn CompletionModel>, config: RunConfig) -> Self {
        let retry = RetryConfig::new(config.retries);
        Self {
            model,
            config: Arc::new(config),
            retry,
            prices: PriceTable::builtin(),
            progress: None,
        }
    }

    /// Override the backoff policy (the retry count still comes from it).
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_price_table(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Process every row, returning the full ordered result set and stats.
    ///
    /// Pre-flight validation (config, identifier uniqueness) happens before
    /// any completion call. A fatal error anywhere aborts the run with
    /// queued rows unresolved; per-row transient exhaustion is recorded on
    /// the row and does not disturb its siblings. When a store is given,
    /// rows with a prior error-free result are skipped and finalized rows
    /// are flushed in bounded batches.
    pub async fn run(
        &self,
        rows: Vec<Row>,
        template: &Template,
        mut store: Option<&mut OutputStore>,
    ) -> Result<RunOutcome> {
        let started = Instant::now();

        self.config.validate()?;
        validate_unique_ids(&rows)?;

        let total = rows.len();
        let ids: Vec<String> = rows.iter().map(|r| r.id()).collect::<Result<_>>()?;

        let mut slots: Vec<Option<Row>> = vec![None; total];
        let mut skipped = 0usize;
        if let Some(store) = store.as_deref() {
            for (index, id) in ids.iter().enumerate() {
                if let Some(prior) = store.existing_ok(id) {
                    slots[index] = Some(prior.clone());
                    skipped += 1;
                }
            }
        }

        info!(
            total = total,
            skipped = skipped,
            concurrency = self.config.concurrency,
            model = %self.config.model,
            "Starting run"
        );

        let stats = shared_token_stats();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let template = Arc::new(template.clone());

        let mut join_set: JoinSet<(usize, String, Result<Row>)> = JoinSet::new();
        for (index, row) in rows.iter().enumerate() {
            if slots[index].is_some() {
                continue;
            }
            let semaphore = Arc::clone(&semaphore);
            let model = Arc::clone(&self.model);
            let config = Arc::clone(&self.config);
            let retry = self.retry.clone();
            let template = Arc::clone(&template);
            let stats = Arc::clone(&stats);
            let row = row.clone();
            let id = ids[index].clone();

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("run semaphore closed");
                let result = retry_row(&retry, &id, || {
                    execute_row(&row, &template, &config, model.as_ref(), &stats)
                })
                .await;
                (index, id, result)
            });
        }

        let flush_threshold = self.config.concurrency;
        let mut completed = skipped;
        let mut succeeded = 0usize;
        let mut failed = 0usize;
        let mut failures: Vec<(String, String)> = Vec::new();

        self.emit_progress(completed, total, succeeded, failed, skipped, &stats);

        while let Some(joined) = join_set.join_next().await {
            // Tasks are only aborted on the early-return path below, so a
            // join failure here is a panicked worker; let it propagate.
            let (index, id, result) = match joined {
                Ok(resolved) => resolved,
                Err(e) => match e.try_into_panic() {
                    Ok(payload) => std::panic::resume_unwind(payload),
                    Err(e) => unreachable!("row task cancelled mid-run: {}", e),
                },
            };

            let finalized = match result {
                Ok(processed) => {
                    succeeded += 1;
                    processed
                }
                Err(e) if e.is_retryable() => {
                    warn!(row_id = %id, error = %e, "Row failed after all retries");
                    let message = e.to_string();
                    failures.push((id, message.clone()));
                    failed += 1;
                    rows[index].with_error(&message)
                }
                Err(e) => {
                    error!(row_id = %id, error = %e, "Fatal error, aborting run");
                    join_set.abort_all();
                    return Err(e);
                }
            };

            slots[index] = Some(finalized.clone());
            completed += 1;

            if let Some(store) = store.as_deref_mut() {
                store.push(finalized);
                if store.buffered() >= flush_threshold {
                    store.flush()?;
                }
            }

            self.emit_progress(completed, total, succeeded, failed, skipped, &stats);
        }

        // Residual rows are flushed even when the buffer never hit the
        // threshold.
        if let Some(store) = store.as_deref_mut() {
            if store.buffered() > 0 {
                store.flush()?;
            }
        }

        // Skipped rows were pre-filled and every spawned task either filled
        // its slot or aborted the run above.
        let rows: Vec<Row> = slots
            .into_iter()
            .map(|slot| slot.expect("row slot resolved"))
            .collect();

        let stats = snapshot(&stats);
        let cost = self.prices.cost(&self.config.model, &stats);
        let summary = RunSummary {
            total,
            succeeded,
            failed,
            skipped,
            stats,
            cost,
            elapsed: started.elapsed(),
            failures,
        };

        info!(
            succeeded = succeeded,
            failed = failed,
            skipped = skipped,
            input_tokens = stats.input_tokens,
            output_tokens = stats.output_tokens,
            "Run finished"
        );

        Ok(RunOutcome {
            rows,
            stats,
            summary,
        })
    }

    fn emit_progress(
        &self,
        completed: usize,
        total: usize,
        succeeded: usize,
        failed: usize,
        skipped: usize,
        stats: &crate::stats::SharedTokenStats,
    ) {
        if let Some(progress) = &self.progress {
            let stats = snapshot(stats);
            progress(ProgressUpdate {
                completed,
                total,
                succeeded,
                failed,
                skipped,
                stats,
                cost: self.prices.cost(&self.config.model, &stats),
            });
        }
    }
}
