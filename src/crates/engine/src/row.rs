//! Row model: one flat, ordered field map per record.
//!
//! Rows are dynamic: there is no closed schema. Identifier extraction and
//! template filling operate purely over the map's keys.

use crate::error::{EngineError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reserved key under which a row's terminal failure is recorded.
pub const ERROR_KEY: &str = "_error";

/// Identifier key spellings, checked in priority order. The first present
/// scalar value names the row.
pub const ID_KEYS: &[&str] = &["noteId", "note_id", "id", "Id", "ID"];

/// One input record: an insertion-ordered mapping from field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from key/value pairs, preserving their order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a field value by exact key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.as_str())
    }

    /// Get a field by case-insensitive key, returning the stored key too.
    pub fn get_ci(&self, key: &str) -> Option<(&str, &str)> {
        let wanted = key.to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| k.to_lowercase() == wanted)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert or replace a field, appending new keys at the end.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Replace the value of a field matched case-insensitively, keeping the
    /// original key casing. Adds the key verbatim when no match exists.
    pub fn insert_ci(&mut self, key: &str, value: impl Into<String>) {
        match self.get_ci(key).map(|(k, _)| k.to_string()) {
            Some(existing) => {
                self.fields.insert(existing, value.into());
            }
            None => {
                self.fields.insert(key.to_string(), value.into());
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Extract the row's identifier.
    ///
    /// Reserved spellings are checked in the fixed order of [`ID_KEYS`];
    /// the first present value wins. A row with none of them is invalid.
    pub fn id(&self) -> Result<String> {
        for key in ID_KEYS {
            if let Some(value) = self.fields.get(*key) {
                return Ok(value.trim().to_string());
            }
        }
        Err(EngineError::Config(format!(
            "row has no identifier field (expected one of: {})",
            ID_KEYS.join(", ")
        )))
    }

    /// Tag a copy of this row with a terminal error message. Original fields
    /// are left untouched.
    pub fn with_error(&self, message: &str) -> Row {
        let mut tagged = self.clone();
        tagged.insert(ERROR_KEY, message);
        tagged
    }

    /// Whether this row carries a recorded error.
    pub fn is_error(&self) -> bool {
        self.fields.contains_key(ERROR_KEY)
    }

    /// The recorded error message, if any.
    pub fn error(&self) -> Option<&str> {
        self.get(ERROR_KEY)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row::from_pairs(iter)
    }
}

/// Verify that every row carries an identifier and that no two rows share
/// one. Runs once, before any scheduling.
pub fn validate_unique_ids(rows: &[Row]) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let id = row
            .id()
            .map_err(|e| EngineError::Validation(format!("row {}: {}", index, e)))?;
        if !seen.insert(id.clone()) {
            return Err(EngineError::Validation(format!(
                "duplicate identifier '{}' (row {})",
                id, index
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_priority_order() {
        let row = Row::from_pairs([("id", "5"), ("noteId", "1650000000000")]);
        assert_eq!(row.id().unwrap(), "1650000000000");

        let row = Row::from_pairs([("Id", "2001"), ("English", "hello")]);
        assert_eq!(row.id().unwrap(), "2001");
    }

    #[test]
    fn test_id_missing() {
        let row = Row::from_pairs([("English", "hello")]);
        assert!(matches!(row.id(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_insert_ci_preserves_casing() {
        let mut row = Row::from_pairs([("id", "1"), ("name", "old")]);
        row.insert_ci("Name", "new");
        assert_eq!(row.get("name"), Some("new"));
        assert_eq!(row.get("Name"), None);

        row.insert_ci("Reading", "kana");
        assert_eq!(row.get("Reading"), Some("kana"));
    }

    #[test]
    fn test_order_preserved() {
        let row = Row::from_pairs([("id", "1"), ("b", "2"), ("a", "3")]);
        let keys: Vec<_> = row.keys().collect();
        assert_eq!(keys, vec!["id", "b", "a"]);
    }

    #[test]
    fn test_error_tagging() {
        let row = Row::from_pairs([("id", "1"), ("f", "a")]);
        let tagged = row.with_error("timed out");
        assert!(tagged.is_error());
        assert_eq!(tagged.error(), Some("timed out"));
        assert_eq!(tagged.get("f"), Some("a"));
        assert!(!row.is_error());
    }

    #[test]
    fn test_validate_unique_ids() {
        let rows = vec![
            Row::from_pairs([("id", "1")]),
            Row::from_pairs([("id", "2")]),
        ];
        assert!(validate_unique_ids(&rows).is_ok());

        let rows = vec![
            Row::from_pairs([("id", "1")]),
            Row::from_pairs([("id", "1")]),
        ];
        assert!(matches!(
            validate_unique_ids(&rows),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_id_as_validation() {
        let rows = vec![Row::from_pairs([("f", "a")])];
        assert!(matches!(
            validate_unique_ids(&rows),
            Err(EngineError::Validation(_))
        ));
    }
}
