//! Progress display, final summary, and the failure log.

use anyhow::{Context, Result};
use colored::Colorize;
use engine::{FailureDetail, ProgressFn, RunSummary};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Failure log file name, created next to the output file.
pub const FAILURE_LOG_NAME: &str = "failures.log";

/// Build the run progress bar.
pub fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}",
        )
        .expect("progress bar template")
        .progress_chars("=>-"),
    );
    bar
}

/// Progress callback that keeps the bar's position and cost readout live.
pub fn progress_callback(bar: ProgressBar) -> ProgressFn {
    Arc::new(move |update| {
        bar.set_position(update.completed as u64);
        bar.set_message(format!(
            "${:.4} | {} in / {} out tok",
            update.cost, update.stats.input_tokens, update.stats.output_tokens
        ));
    })
}

/// Print the final run summary.
pub fn print_summary(summary: &RunSummary, failure_log: Option<&Path>) {
    let detail = if failure_log.is_some() {
        FailureDetail::LogFile
    } else {
        FailureDetail::Inline
    };
    let log_name = failure_log.map(|p| p.display().to_string());

    for (index, line) in summary.render(detail, log_name.as_deref()).iter().enumerate() {
        if index == 0 {
            if summary.failed == 0 {
                println!("{}", line.green());
            } else {
                println!("{}", line.yellow());
            }
        } else if line.contains("failed") {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}

/// Append every failure to a timestamped, append-only log file.
pub fn write_failure_log(path: &Path, failures: &[(String, String)]) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    for (id, message) in failures {
        writeln!(
            file,
            "{} id={} error={}",
            chrono::Utc::now().to_rfc3339(),
            id,
            message
        )
        .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::TokenStats;
    use std::time::Duration;

    #[test]
    fn test_failure_log_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(FAILURE_LOG_NAME);

        write_failure_log(&path, &[("1".into(), "timed out".into())]).unwrap();
        write_failure_log(&path, &[("2".into(), "rate limited".into())]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("id=1"));
        assert!(lines[1].contains("error=rate limited"));
    }

    #[test]
    fn test_summary_render_modes() {
        let summary = RunSummary {
            total: 2,
            succeeded: 1,
            failed: 1,
            skipped: 0,
            stats: TokenStats::default(),
            cost: 0.0,
            elapsed: Duration::from_secs(1),
            failures: vec![("7".into(), "boom".into())],
        };

        let inline = summary.render(FailureDetail::Inline, None);
        assert!(inline.iter().any(|l| l.contains("7: boom")));

        let pointed = summary.render(FailureDetail::LogFile, Some("failures.log"));
        assert!(pointed.iter().any(|l| l.contains("failures.log")));
        assert!(!pointed.iter().any(|l| l.contains("7: boom")));
    }
}
