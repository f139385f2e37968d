//! Token accounting and cost reporting.

use crate::llm::UsageMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Running token totals for one run.
///
/// Shared across every in-flight row. Tasks run on a multi-threaded runtime,
/// so the counter lives behind a mutex; see [`SharedTokenStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenStats {
    pub fn add(&mut self, usage: UsageMetadata) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Token counter shared by all concurrently executing rows.
pub type SharedTokenStats = Arc<Mutex<TokenStats>>;

pub fn shared_token_stats() -> SharedTokenStats {
    Arc::new(Mutex::new(TokenStats::default()))
}

/// Record one call's usage into the shared counter.
pub fn record_usage(stats: &SharedTokenStats, usage: UsageMetadata) {
    let mut guard = stats.lock().expect("token stats lock poisoned");
    guard.add(usage);
}

/// Read the current totals.
pub fn snapshot(stats: &SharedTokenStats) -> TokenStats {
    *stats.lock().expect("token stats lock poisoned")
}

/// USD cost per million input/output tokens for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// Per-model price table used to derive running cost.
///
/// Lookup is exact first, then by longest matching prefix so dated model ids
/// ("claude-3-5-haiku-20241022") hit their family entry. Unknown models cost
/// zero rather than guessing.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    prices: HashMap<String, ModelPrice>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in prices for the model families the bundled providers speak.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.set("claude-3-5-haiku", ModelPrice { input_per_mtok: 0.80, output_per_mtok: 4.00 });
        table.set("claude-3-5-sonnet", ModelPrice { input_per_mtok: 3.00, output_per_mtok: 15.00 });
        table.set("claude-3-haiku", ModelPrice { input_per_mtok: 0.25, output_per_mtok: 1.25 });
        table.set("claude-3-opus", ModelPrice { input_per_mtok: 15.00, output_per_mtok: 75.00 });
        table.set("gpt-4o-mini", ModelPrice { input_per_mtok: 0.15, output_per_mtok: 0.60 });
        table.set("gpt-4o", ModelPrice { input_per_mtok: 2.50, output_per_mtok: 10.00 });
        table.set("gpt-4.1-mini", ModelPrice { input_per_mtok: 0.40, output_per_mtok: 1.60 });
        table.set("gpt-4.1", ModelPrice { input_per_mtok: 2.00, output_per_mtok: 8.00 });
        table
    }

    pub fn set(&mut self, model: impl Into<String>, price: ModelPrice) {
        self.prices.insert(model.into(), price);
    }

    pub fn get(&self, model: &str) -> Option<ModelPrice> {
        if let Some(price) = self.prices.get(model) {
            return Some(*price);
        }
        self.prices
            .iter()
            .filter(|(key, _)| model.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, price)| *price)
    }

    /// Cost in USD of the given totals under the given model.
    pub fn cost(&self, model: &str, stats: &TokenStats) -> f64 {
        match self.get(model) {
            Some(price) => {
                (stats.input_tokens as f64 / 1_000_000.0) * price.input_per_mtok
                    + (stats.output_tokens as f64 / 1_000_000.0) * price.output_per_mtok
            }
            None => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelPrice)> {
        self.prices.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Final accounting for one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub stats: TokenStats,
    pub cost: f64,
    pub elapsed: Duration,
    /// (identifier, final error message) for every failed row.
    pub failures: Vec<(String, String)>,
}

/// Where failure detail goes in the rendered summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDetail {
    /// Every failed row listed inline.
    Inline,
    /// A single pointer to a failure log file.
    LogFile,
}

impl RunSummary {
    /// Format the summary as display lines.
    pub fn render(&self, detail: FailureDetail, log_path: Option<&str>) -> Vec<String> {
        let mut lines = vec![
            format!(
                "Processed {} row(s): {} succeeded, {} failed, {} skipped (already done)",
                self.total, self.succeeded, self.failed, self.skipped
            ),
            format!(
                "Tokens: {} in / {} out ({} total), cost ${:.4}",
                self.stats.input_tokens,
                self.stats.output_tokens,
                self.stats.total_tokens(),
                self.cost
            ),
            format!("Elapsed: {:.1}s", self.elapsed.as_secs_f64()),
        ];

        if !self.failures.is_empty() {
            match detail {
                FailureDetail::Inline => {
                    lines.push(format!("{} row(s) failed:", self.failures.len()));
                    for (id, message) in &self.failures {
                        lines.push(format!("  {}: {}", id, message));
                    }
                }
                FailureDetail::LogFile => {
                    lines.push(format!(
                        "{} row(s) failed, see {}",
                        self.failures.len(),
                        log_path.unwrap_or("the failure log")
                    ));
                }
            }
        }

        lines
    }
}
