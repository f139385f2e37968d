//! Crash-safe output persistence and resume support.
//!
//! The store loads prior output once at startup (unless forced), buffers
//! freshly completed rows during the run, and on each flush rebuilds the
//! complete output set and writes it atomically: serialize to a temp file in
//! the destination directory, then rename into place. A crash mid-write
//! leaves the previous good file untouched.

use crate::codec::RowFormat;
use crate::error::{EngineError, Result};
use crate::row::Row;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Durable output destination for one run.
pub struct OutputStore {
    path: PathBuf,
    format: RowFormat,
    /// Identifiers of every original input row, in input order. Flushes
    /// rebuild the full output from this, not just the current run's subset.
    input_ids: Vec<String>,
    /// Prior output indexed by identifier, loaded once at startup.
    existing: HashMap<String, Row>,
    /// Rows completed by this run, cumulative across flushes.
    fresh: HashMap<String, Row>,
    /// Completed rows awaiting the next flush.
    buffer: Vec<Row>,
}

impl OutputStore {
    /// Open an output destination, loading prior content for resume.
    ///
    /// With `force` the destination's prior content is ignored and every row
    /// is processed from scratch. `input_rows` must be the full original
    /// input set (already validated for unique identifiers).
    pub fn open(path: impl Into<PathBuf>, input_rows: &[Row], force: bool) -> Result<Self> {
        let path = path.into();
        let format = RowFormat::from_path(&path)?;

        let mut input_ids = Vec::with_capacity(input_rows.len());
        for row in input_rows {
            input_ids.push(row.id()?);
        }

        let mut existing = HashMap::new();
        if !force && path.exists() {
            let data = std::fs::read(&path)?;
            if !data.is_empty() {
                for row in format.decode(&data)? {
                    match row.id() {
                        Ok(id) => {
                            existing.insert(id, row);
                        }
                        Err(_) => {
                            warn!(path = %path.display(), "Skipping prior output row without an identifier");
                        }
                    }
                }
                info!(
                    path = %path.display(),
                    entries = existing.len(),
                    "Loaded prior output for resume"
                );
            }
        }

        Ok(Self {
            path,
            format,
            input_ids,
            existing,
            fresh: HashMap::new(),
            buffer: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The prior, error-free result for a row, if one exists. Rows with such
    /// an entry are excluded from the run's work set; errored entries are
    /// re-attempted.
    pub fn existing_ok(&self, id: &str) -> Option<&Row> {
        self.existing.get(id).filter(|row| !row.is_error())
    }

    /// Queue a finalized row for the next flush.
    pub fn push(&mut self, row: Row) {
        self.buffer.push(row);
    }

    /// Number of rows waiting to be flushed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Merge the buffer into the cumulative result map and atomically write
    /// the rebuilt output file.
    ///
    /// For every original input row the freshest result wins: this run's
    /// value, else the prior one, else the row is omitted entirely. The file
    /// is therefore complete and parseable at every flush boundary.
    pub fn flush(&mut self) -> Result<()> {
        for row in self.buffer.drain(..) {
            match row.id() {
                Ok(id) => {
                    self.fresh.insert(id, row);
                }
                Err(e) => {
                    // Cannot happen for rows that passed pre-flight validation.
                    return Err(EngineError::Persistence(format!(
                        "buffered row lost its identifier: {}",
                        e
                    )));
                }
            }
        }

        let mut merged = Vec::with_capacity(self.input_ids.len());
        for id in &self.input_ids {
            if let Some(row) = self.fresh.get(id).or_else(|| self.existing.get(id)) {
                merged.push(row.clone());
            }
        }

        let encoded = self.format.encode(&merged)?;
        write_atomic(&self.path, &encoded)?;

        debug!(
            path = %self.path.display(),
            rows = merged.len(),
            "Flushed output"
        );
        Ok(())
    }
}

/// Write bytes to `path` via a temp file in the same directory and an atomic
/// rename.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new_in("."),
    }
    .map_err(|e| EngineError::Persistence(format!("creating temp file: {}", e)))?;

    tmp.write_all(data)
        .and_then(|_| tmp.flush())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| EngineError::Persistence(format!("writing temp file: {}", e)))?;

    tmp.persist(path)
        .map_err(|e| EngineError::Persistence(format!("renaming into place: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rows() -> Vec<Row> {
        vec![
            Row::from_pairs([("id", "1"), ("f", "a")]),
            Row::from_pairs([("id", "2"), ("f", "b")]),
            Row::from_pairs([("id", "3"), ("f", "c")]),
        ]
    }

    #[test]
    fn test_fresh_store_has_no_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let input = rows();
        let store = OutputStore::open(&path, &input, false).unwrap();
        assert!(store.existing_ok("1").is_none());
    }

    #[test]
    fn test_flush_writes_merged_output_in_input_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let input = rows();
        let mut store = OutputStore::open(&path, &input, false).unwrap();

        // Out-of-order completion.
        store.push(Row::from_pairs([("id", "3"), ("f", "C")]));
        store.push(Row::from_pairs([("id", "1"), ("f", "A")]));
        store.flush().unwrap();

        let written = crate::codec::read_rows(&path).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].get("id"), Some("1"));
        assert_eq!(written[1].get("id"), Some("3"));
    }

    #[test]
    fn test_resume_skips_ok_reattempts_errored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let input = rows();

        let mut store = OutputStore::open(&path, &input, false).unwrap();
        store.push(Row::from_pairs([("id", "1"), ("f", "A")]));
        store.push(Row::from_pairs([("id", "2"), ("f", "b")]).with_error("timed out"));
        store.flush().unwrap();
        drop(store);

        let store = OutputStore::open(&path, &input, false).unwrap();
        assert!(store.existing_ok("1").is_some());
        assert!(store.existing_ok("2").is_none());
        assert!(store.existing_ok("3").is_none());
    }

    #[test]
    fn test_force_ignores_prior_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let input = rows();

        let mut store = OutputStore::open(&path, &input, false).unwrap();
        store.push(Row::from_pairs([("id", "1"), ("f", "A")]));
        store.flush().unwrap();
        drop(store);

        let store = OutputStore::open(&path, &input, true).unwrap();
        assert!(store.existing_ok("1").is_none());
    }

    #[test]
    fn test_later_flush_prefers_fresh_over_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let input = rows();

        let mut store = OutputStore::open(&path, &input, false).unwrap();
        store.push(Row::from_pairs([("id", "1"), ("f", "old")]));
        store.flush().unwrap();
        drop(store);

        let mut store = OutputStore::open(&path, &input, false).unwrap();
        store.push(Row::from_pairs([("id", "1"), ("f", "new")]));
        store.flush().unwrap();

        let written = crate::codec::read_rows(&path).unwrap();
        assert_eq!(written[0].get("f"), Some("new"));
    }

    #[test]
    fn test_flush_keeps_prior_rows_not_in_this_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let input = rows();

        let mut store = OutputStore::open(&path, &input, false).unwrap();
        store.push(Row::from_pairs([("id", "2"), ("f", "B")]));
        store.flush().unwrap();
        drop(store);

        let mut store = OutputStore::open(&path, &input, false).unwrap();
        store.push(Row::from_pairs([("id", "1"), ("f", "A")]));
        store.flush().unwrap();

        let written = crate::codec::read_rows(&path).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].get("f"), Some("A"));
        assert_eq!(written[1].get("f"), Some("B"));
    }

    #[test]
    fn test_output_file_always_parseable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let input = rows();

        let mut store = OutputStore::open(&path, &input, false).unwrap();
        for n in 1..=3 {
            store.push(Row::from_pairs([
                ("id", n.to_string().as_str()),
                ("f", "x"),
            ]));
            store.flush().unwrap();
            // Parse back after every flush boundary.
            let written = crate::codec::read_rows(&path).unwrap();
            assert_eq!(written.len(), n as usize);
        }
    }

    #[test]
    fn test_aborted_write_leaves_prior_output_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, b"[{\"id\": \"1\", \"f\": \"a\"}]").unwrap();

        // A crash mid-write: the temp file is created and partially filled
        // but never renamed into place.
        let mut tmp = NamedTempFile::new_in(dir.path()).unwrap();
        tmp.write_all(b"[{\"id\": \"1\", \"f\":").unwrap();
        drop(tmp);

        let written = crate::codec::read_rows(&path).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].get("f"), Some("a"));
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, b"[]").unwrap();
        write_atomic(&path, b"[{\"id\": \"1\"}]").unwrap();
        let data = std::fs::read_to_string(&path).unwrap();
        assert!(data.contains("\"1\""));
    }
}
