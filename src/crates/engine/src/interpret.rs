//! Completion-response interpretation.
//!
//! Two independent choices are made per run: how the usable result is
//! extracted from the raw completion text, and how that result is merged
//! back into the row.

use crate::error::{EngineError, Result};
use crate::row::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const RESULT_OPEN: &str = "<result>";
const RESULT_CLOSE: &str = "</result>";

/// How a completion result is applied to its row. Selected once per run and
/// threaded through the executor and scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "field", rename_all = "snake_case")]
pub enum MergeMode {
    /// The result string becomes the new value of one named field.
    SingleField(String),
    /// The result must parse as a JSON object whose fields are merged into
    /// the row case-insensitively.
    StructuredMerge,
}

/// Extract the usable result from raw completion text.
///
/// With `require_tag` the text must contain a `<result>...</result>` region;
/// its absence usually means a malformed completion, so it is reported as a
/// transient error worth re-requesting. Without the tag requirement the
/// trimmed raw text is the result.
pub fn extract_result(raw: &str, require_tag: bool) -> Result<String> {
    if !require_tag {
        return Ok(raw.trim().to_string());
    }

    let open = raw.find(RESULT_OPEN).ok_or_else(|| {
        EngineError::Transient(format!("completion is missing the {} marker", RESULT_OPEN))
    })?;
    let rest = &raw[open + RESULT_OPEN.len()..];
    let close = rest.find(RESULT_CLOSE).ok_or_else(|| {
        EngineError::Transient(format!("completion is missing the {} marker", RESULT_CLOSE))
    })?;
    Ok(rest[..close].trim().to_string())
}

/// Merge an extracted result into a row according to the run's merge mode.
/// Returns a new row; the input row is never mutated.
pub fn apply_merge(row: &Row, result: &str, mode: &MergeMode) -> Result<Row> {
    let mut merged = row.clone();
    match mode {
        MergeMode::SingleField(field) => {
            merged.insert_ci(field, result);
        }
        MergeMode::StructuredMerge => {
            let object = parse_object(result)?;
            for (key, value) in object {
                merged.insert_ci(&key, value_to_string(&value));
            }
        }
    }
    Ok(merged)
}

/// Parse the result as a single JSON key/value object.
///
/// Models routinely wrap JSON in markdown fences, so those are stripped
/// before parsing. Arrays, scalars, and unparseable text are transient
/// failures: a retry usually produces a well-formed object.
fn parse_object(result: &str) -> Result<Vec<(String, Value)>> {
    let stripped = strip_code_fence(result);
    let value: Value = serde_json::from_str(stripped)
        .map_err(|e| EngineError::Transient(format!("response is not valid JSON: {}", e)))?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(EngineError::Transient(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline.
    let body = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => return trimmed,
    };
    body.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
