//! Persisted user preferences.
//!
//! Defaults for flags the user does not want to repeat on every invocation,
//! read from `~/.notefill/config.toml`. Command-line flags always win over
//! preferences; preferences win over built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Optional defaults loaded from the user's config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Provider name ("claude" or "openai").
    pub provider: Option<String>,

    /// Model identifier.
    pub model: Option<String>,

    /// Override for the provider's API base URL.
    pub base_url: Option<String>,

    /// Default concurrency limit.
    pub concurrency: Option<usize>,

    /// Default retry count.
    pub retries: Option<u32>,

    /// Default sampling temperature.
    pub temperature: Option<f32>,
}

impl Preferences {
    /// Location of the user-level config file, if a home directory exists.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".notefill").join("config.toml"))
    }

    /// Load preferences, returning defaults when no file exists.
    pub fn load() -> Result<Self> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load preferences from a specific file.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading preferences from {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("parsing preferences in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "provider = \"claude\"\nmodel = \"claude-3-5-haiku-latest\"\nconcurrency = 8"
        )
        .unwrap();

        let prefs = Preferences::load_from(file.path()).unwrap();
        assert_eq!(prefs.provider.as_deref(), Some("claude"));
        assert_eq!(prefs.model.as_deref(), Some("claude-3-5-haiku-latest"));
        assert_eq!(prefs.concurrency, Some(8));
        assert_eq!(prefs.retries, None);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "provider = [not toml").unwrap();
        assert!(Preferences::load_from(file.path()).is_err());
    }
}
