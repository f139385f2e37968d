//! Single-row execution pipeline.
//!
//! One executor invocation takes a row through template filling, a timed
//! completion call, token accounting, and result interpretation. Retry and
//! fan-out live in the scheduler; this module is one attempt for one row.

use crate::config::RunConfig;
use crate::error::{EngineError, Result};
use crate::interpret::{apply_merge, extract_result};
use crate::llm::{CompletionModel, CompletionRequest};
use crate::row::Row;
use crate::stats::{record_usage, SharedTokenStats};
use crate::template::Template;
use tracing::trace;

/// Reserved key holding the rendered prompt on dry runs.
pub const PROMPT_KEY: &str = "_prompt";

/// Run one attempt for one row, producing the merged row.
///
/// Template errors propagate unchanged (they are fatal and must abort the
/// run); a completion call that outlives `config.request_timeout` is a
/// retryable timeout. On success the call's reported usage is folded into
/// the shared counter before interpretation, so cost reporting counts calls
/// whose responses later fail to parse.
pub async fn execute_row<M: CompletionModel + ?Sized>(
    row: &Row,
    template: &Template,
    config: &RunConfig,
    model: &M,
    stats: &SharedTokenStats,
) -> Result<Row> {
    let prompt = template.fill(row)?;

    if config.dry_run {
        let mut rendered = row.clone();
        rendered.insert(PROMPT_KEY, prompt);
        return Ok(rendered);
    }

    let request = CompletionRequest {
        model: config.model.clone(),
        prompt,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let timeout_secs = config.request_timeout.as_secs();
    let response = tokio::time::timeout(config.request_timeout, model.complete(request))
        .await
        .map_err(|_| EngineError::Timeout { secs: timeout_secs })??;

    if let Some(usage) = response.usage {
        record_usage(stats, usage);
    }

    trace!(chars = response.text.len(), "Completion received");

    let result = extract_result(&response.text, config.require_result_tag)?;
    apply_merge(row, &result, &config.merge_mode)
}
