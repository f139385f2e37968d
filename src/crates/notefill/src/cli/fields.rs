//! The `fields` subcommand: inspect the fields present in a row file.

use anyhow::{Context, Result};
use engine::Row;
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct FieldsArgs {
    /// Row file to inspect (.json or .csv)
    pub input: PathBuf,
}

/// One field's presence across a row set.
#[derive(Debug, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub filled: usize,
    pub sample: Option<String>,
}

/// Collect field names in first-seen order with fill counts and a sample.
pub fn summarize_fields(rows: &[Row]) -> Vec<FieldInfo> {
    let mut infos: Vec<FieldInfo> = Vec::new();
    for row in rows {
        for (key, value) in row.iter() {
            let position = infos.iter().position(|i| i.name == key);
            let info = match position {
                Some(position) => &mut infos[position],
                None => {
                    infos.push(FieldInfo {
                        name: key.to_string(),
                        filled: 0,
                        sample: None,
                    });
                    infos.last_mut().expect("just pushed")
                }
            };
            if !value.is_empty() {
                info.filled += 1;
                if info.sample.is_none() {
                    info.sample = Some(value.to_string());
                }
            }
        }
    }
    infos
}

pub fn handle_fields(args: &FieldsArgs) -> Result<i32> {
    let rows = engine::read_rows(&args.input)
        .with_context(|| format!("reading rows from {}", args.input.display()))?;

    println!("{} row(s) in {}", rows.len(), args.input.display());
    for info in summarize_fields(&rows) {
        let sample = info
            .sample
            .as_deref()
            .map(truncate)
            .unwrap_or_else(|| "(empty)".to_string());
        println!(
            "  {:<24} {:>5}/{} filled   e.g. {}",
            info.name,
            info.filled,
            rows.len(),
            sample
        );
    }
    Ok(0)
}

fn truncate(value: &str) -> String {
    const MAX: usize = 48;
    if value.chars().count() <= MAX {
        value.to_string()
    } else {
        let cut: String = value.chars().take(MAX).collect();
        format!("{}…", cut)
    }
}
