//! The `run` subcommand: drive a row file through the completion provider.

use crate::cli::report;
use crate::prefs::Preferences;
use crate::shutdown::{ShutdownCoordinator, INTERRUPT_EXIT_CODE};
use anyhow::{bail, Context, Result};
use engine::{
    CompletionModel, CompletionRequest, CompletionResponse, MergeMode, OutputStore, Row,
    RunConfig, Scheduler, Template, PROMPT_KEY,
};
use llm::{ProviderKind, RemoteLlmConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Input row file (.json or .csv)
    pub input: PathBuf,

    /// Output row file; results are merged into it incrementally
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Prompt template with {field} placeholders
    #[arg(short, long, conflicts_with = "template_file")]
    pub template: Option<String>,

    /// Read the prompt template from a file
    #[arg(long)]
    pub template_file: Option<PathBuf>,

    /// Write each result into this field (single-field mode)
    #[arg(short, long, conflicts_with = "structured")]
    pub field: Option<String>,

    /// Merge a JSON-object response into each row (structured mode)
    #[arg(long)]
    pub structured: bool,

    /// Model identifier
    #[arg(short, long)]
    pub model: Option<String>,

    /// Provider: claude or openai
    #[arg(long)]
    pub provider: Option<String>,

    /// Override the provider API base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Maximum rows in flight at once
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Additional attempts per row after the first
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Require a <result>...</result> region in completions
    #[arg(long)]
    pub require_tag: bool,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Cap on output tokens per call
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Render prompts without calling the provider or writing output
    #[arg(long)]
    pub dry_run: bool,

    /// Ignore prior output and reprocess every row
    #[arg(long)]
    pub force: bool,

    /// Record failure detail in failures.log instead of inline
    #[arg(long)]
    pub failure_log: bool,
}

/// Placeholder client for dry runs; the executor never calls it.
struct NullClient;

#[async_trait::async_trait]
impl CompletionModel for NullClient {
    async fn complete(&self, _request: CompletionRequest) -> engine::Result<CompletionResponse> {
        Err(engine::EngineError::Config(
            "no completion provider configured for a dry run".into(),
        ))
    }
}

pub async fn handle_run(args: RunArgs) -> Result<i32> {
    let prefs = Preferences::load()?;

    let template_text = match (&args.template, &args.template_file) {
        (Some(text), None) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading template from {}", path.display()))?,
        (None, None) => bail!("provide a template with --template or --template-file"),
        (Some(_), Some(_)) => unreachable!("clap rejects the combination"),
    };
    let template = Template::new(template_text.trim_end());

    let merge_mode = match (&args.field, args.structured) {
        (Some(field), false) => MergeMode::SingleField(field.clone()),
        (None, true) => MergeMode::StructuredMerge,
        (None, false) => bail!("choose a merge mode: --field <name> or --structured"),
        (Some(_), true) => unreachable!("clap rejects the combination"),
    };

    let rows = engine::read_rows(&args.input)
        .with_context(|| format!("reading rows from {}", args.input.display()))?;
    if rows.is_empty() {
        println!("{} contains no rows, nothing to do", args.input.display());
        return Ok(0);
    }
    engine::validate_unique_ids(&rows).context("invalid input rows")?;

    let model = args
        .model
        .clone()
        .or_else(|| prefs.model.clone())
        .context("no model given (use --model or set one in preferences)")?;

    let mut config = RunConfig::new(model, merge_mode)
        .with_require_result_tag(args.require_tag)
        .with_dry_run(args.dry_run)
        .with_request_timeout(Duration::from_secs(args.timeout_secs));
    if let Some(concurrency) = args.concurrency.or(prefs.concurrency) {
        config = config.with_concurrency(concurrency);
    }
    if let Some(retries) = args.retries.or(prefs.retries) {
        config = config.with_retries(retries);
    }
    if let Some(temperature) = args.temperature.or(prefs.temperature) {
        config = config.with_temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        config = config.with_max_tokens(max_tokens);
    }

    if args.dry_run {
        return dry_run(rows, &template, config).await;
    }

    let output = args
        .output
        .clone()
        .context("an output file is required (use --output)")?;
    let mut store = OutputStore::open(&output, &rows, args.force)?;

    let client = build_client(&args, &prefs)?;

    let shutdown = ShutdownCoordinator::new();
    let signal_task = shutdown.install_signal_handler();

    let bar = report::progress_bar(rows.len());
    let scheduler = Scheduler::new(client, config)
        .with_progress(report::progress_callback(bar.clone()));

    info!(input = %args.input.display(), output = %output.display(), "Starting run");

    let outcome = tokio::select! {
        outcome = scheduler.run(rows, &template, Some(&mut store)) => outcome,
        _ = shutdown.wait_for_shutdown() => {
            bar.abandon_with_message("interrupted");
            eprintln!("interrupted; output is valid as of the last flush");
            std::process::exit(INTERRUPT_EXIT_CODE);
        }
    };
    signal_task.abort();

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            bar.abandon();
            return Err(e).context("run aborted");
        }
    };
    bar.finish_and_clear();

    let log_path = if args.failure_log && !outcome.summary.failures.is_empty() {
        let path = output
            .parent()
            .map(|dir| dir.join(report::FAILURE_LOG_NAME))
            .unwrap_or_else(|| PathBuf::from(report::FAILURE_LOG_NAME));
        report::write_failure_log(&path, &outcome.summary.failures)?;
        Some(path)
    } else {
        None
    };

    report::print_summary(&outcome.summary, log_path.as_deref());
    Ok(0)
}

/// Render every prompt without touching the provider or any output file.
async fn dry_run(rows: Vec<Row>, template: &Template, config: RunConfig) -> Result<i32> {
    let scheduler = Scheduler::new(Arc::new(NullClient), config);
    let outcome = scheduler.run(rows, template, None).await?;

    for row in &outcome.rows {
        if let Some(prompt) = row.get(PROMPT_KEY) {
            println!("--- {} ---", row.id().unwrap_or_else(|_| "?".into()));
            println!("{}\n", prompt);
        }
    }
    println!("{} prompt(s) rendered, no completion calls made", outcome.rows.len());
    Ok(0)
}

fn build_client(args: &RunArgs, prefs: &Preferences) -> Result<Arc<dyn CompletionModel>> {
    let provider_name = args
        .provider
        .clone()
        .or_else(|| prefs.provider.clone())
        .unwrap_or_else(|| "claude".to_string());
    let kind = ProviderKind::parse(&provider_name)
        .with_context(|| format!("unknown provider '{}'", provider_name))?;

    let base_url = args
        .base_url
        .clone()
        .or_else(|| prefs.base_url.clone())
        .unwrap_or_else(|| kind.default_base_url().to_string());

    let config = RemoteLlmConfig::from_env(kind.api_key_env(), base_url)?;
    Ok(kind.build(config)?)
}
