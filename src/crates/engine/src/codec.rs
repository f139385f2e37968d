//! Row-set encoding and decoding.
//!
//! Two tabular formats are supported, selected by file extension: a JSON
//! array of flat string-keyed objects, and CSV with a header line. Both
//! round-trip a list of flat records; field order survives.

use crate::error::{EngineError, Result};
use crate::row::Row;
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;

/// Supported row-file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Json,
    Csv,
}

impl RowFormat {
    /// Pick a format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(RowFormat::Json),
            Some("csv") => Ok(RowFormat::Csv),
            other => Err(EngineError::Validation(format!(
                "unsupported row file extension {:?} for {} (expected .json or .csv)",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Decode a row set from raw bytes.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<Row>> {
        match self {
            RowFormat::Json => decode_json(data),
            RowFormat::Csv => decode_csv(data),
        }
    }

    /// Encode a row set to bytes.
    pub fn encode(&self, rows: &[Row]) -> Result<Vec<u8>> {
        match self {
            RowFormat::Json => encode_json(rows),
            RowFormat::Csv => encode_csv(rows),
        }
    }
}

/// Read and decode a row file.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let format = RowFormat::from_path(path)?;
    let data = std::fs::read(path)?;
    format.decode(&data)
}

fn decode_json(data: &[u8]) -> Result<Vec<Row>> {
    // Deserialize through IndexMap so field order survives the trip.
    let items: Vec<IndexMap<String, Value>> = serde_json::from_slice(data).map_err(|e| {
        EngineError::Validation(format!(
            "row file must contain a JSON array of objects: {}",
            e
        ))
    })?;

    Ok(items
        .into_iter()
        .map(|map| {
            map.into_iter()
                .map(|(k, v)| (k, scalar_to_string(&v)))
                .collect()
        })
        .collect())
}

fn encode_json(rows: &[Row]) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(rows)?;
    out.push(b'\n');
    Ok(out)
}

fn decode_csv(data: &[u8]) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| EngineError::Validation(format!("bad CSV header: {}", e)))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| EngineError::Validation(format!("bad CSV record: {}", e)))?;
        rows.push(
            headers
                .iter()
                .zip(record.iter())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
    }
    Ok(rows)
}

fn encode_csv(rows: &[Row]) -> Result<Vec<u8>> {
    // Header is the union of keys across all rows, in first-seen order.
    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !headers.contains(&key) {
                headers.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&headers)
        .map_err(|e| EngineError::Persistence(format!("CSV write failed: {}", e)))?;
    for row in rows {
        let record: Vec<&str> = headers
            .iter()
            .map(|h| row.get(h).unwrap_or(""))
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| EngineError::Persistence(format!("CSV write failed: {}", e)))?;
    }

    writer
        .into_inner()
        .map_err(|e| EngineError::Persistence(format!("CSV write failed: {}", e)))
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
