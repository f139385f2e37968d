//! Prompt template filling.
//!
//! Templates use `{name}` placeholders matched case-insensitively against row
//! keys. Filling is a pure function: no IO, deterministic, single pass.

use crate::error::{EngineError, Result};
use crate::row::Row;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}\n]+)\}").expect("placeholder regex"));

/// A prompt template.
#[derive(Debug, Clone)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Placeholder names appearing in the template, in order of first use.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for cap in PLACEHOLDER.captures_iter(&self.text) {
            let name = cap.get(1).expect("placeholder group").as_str();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Render the template against one row.
    ///
    /// Fails before any substitution if two row keys collide once lower-cased,
    /// and reports every missing placeholder at once rather than the first.
    /// Replaced text is not re-scanned for new placeholders.
    pub fn fill(&self, row: &Row) -> Result<String> {
        let mut by_lower: HashMap<String, &str> = HashMap::with_capacity(row.len());
        for (key, value) in row.iter() {
            if by_lower.insert(key.to_lowercase(), value).is_some() {
                return Err(EngineError::Config(format!(
                    "row has ambiguous keys: '{}' collides case-insensitively with another field",
                    key
                )));
            }
        }

        let missing: Vec<&str> = self
            .placeholders()
            .into_iter()
            .filter(|name| !by_lower.contains_key(&name.to_lowercase()))
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::Config(format!(
                "template references missing field(s): {}",
                missing.join(", ")
            )));
        }

        let rendered = PLACEHOLDER.replace_all(&self.text, |cap: &regex::Captures<'_>| {
            let name = cap.get(1).expect("placeholder group").as_str();
            by_lower
                .get(&name.to_lowercase())
                .copied()
                .unwrap_or("")
                .to_string()
        });

        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_fill() {
        let template = Template::new("Translate: {English} -> {Japanese}");
        let row = Row::from_pairs([
            ("id", "1"),
            ("English", "hello"),
            ("Japanese", "こんにちは"),
        ]);
        assert_eq!(
            template.fill(&row).unwrap(),
            "Translate: hello -> こんにちは"
        );
    }

    #[test]
    fn test_case_insensitive_match() {
        let template = Template::new("{english}");
        let row = Row::from_pairs([("id", "1"), ("English", "hi")]);
        assert_eq!(template.fill(&row).unwrap(), "hi");
    }

    #[test]
    fn test_ambiguous_row_keys() {
        let template = Template::new("{name}");
        let row = Row::from_pairs([("id", "1"), ("Name", "a"), ("name", "b")]);
        let err = template.fill(&row).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn test_all_missing_placeholders_reported() {
        let template = Template::new("{a} {b} {c}");
        let row = Row::from_pairs([("id", "1"), ("b", "x")]);
        let err = template.fill(&row).unwrap_err().to_string();
        assert!(err.contains("a"));
        assert!(err.contains("c"));
        assert!(!err.contains("b,"));
    }

    #[test]
    fn test_no_rescan_of_replaced_text() {
        let template = Template::new("{outer}");
        let row = Row::from_pairs([("id", "1"), ("outer", "{inner}"), ("inner", "nope")]);
        assert_eq!(template.fill(&row).unwrap(), "{inner}");
    }

    #[test]
    fn test_repeated_placeholder() {
        let template = Template::new("{word} and {word}");
        let row = Row::from_pairs([("id", "1"), ("word", "x")]);
        assert_eq!(template.fill(&row).unwrap(), "x and x");
    }

    #[test]
    fn test_empty_value_renders_empty() {
        let template = Template::new("[{notes}]");
        let row = Row::from_pairs([("id", "1"), ("notes", "")]);
        assert_eq!(template.fill(&row).unwrap(), "[]");
    }

    #[test]
    fn test_placeholders_in_order() {
        let template = Template::new("{b} {a} {b}");
        assert_eq!(template.placeholders(), vec!["b", "a"]);
    }
}
