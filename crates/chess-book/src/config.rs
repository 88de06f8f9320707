//! Loader tuning, loaded from TOML.
//!
//! All fields are optional in the file:
//!
//! ```toml
//! slice_budget_ms = 20
//! resume_delay_ms = 5
//! check_interval = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Time-slicing parameters for the loader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// How long one slice may run before yielding, in milliseconds.
    #[serde(default = "default_slice_budget_ms")]
    pub slice_budget_ms: u64,
    /// Delay before the next slice starts, in milliseconds.
    #[serde(default = "default_resume_delay_ms")]
    pub resume_delay_ms: u64,
    /// Number of units decoded between clock reads.
    #[serde(default = "default_check_interval")]
    pub check_interval: usize,
}

fn default_slice_budget_ms() -> u64 {
    20
}

fn default_resume_delay_ms() -> u64 {
    5
}

fn default_check_interval() -> usize {
    1000
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            slice_budget_ms: default_slice_budget_ms(),
            resume_delay_ms: default_resume_delay_ms(),
            check_interval: default_check_interval(),
        }
    }
}

impl LoaderConfig {
    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read, or
    /// [`ConfigError::ParseError`] if it is not valid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] if the text is not valid TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Maximum time one slice may run.
    #[must_use]
    pub fn slice_budget(&self) -> Duration {
        Duration::from_millis(self.slice_budget_ms)
    }

    /// Delay before the next slice.
    #[must_use]
    pub fn resume_delay(&self) -> Duration {
        Duration::from_millis(self.resume_delay_ms)
    }

    /// Units between clock reads, never zero.
    #[must_use]
    pub fn check_interval(&self) -> usize {
        self.check_interval.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.slice_budget(), Duration::from_millis(20));
        assert_eq!(config.resume_delay(), Duration::from_millis(5));
        assert_eq!(config.check_interval(), 1000);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = LoaderConfig::from_toml_str("slice_budget_ms = 50\n").unwrap();
        assert_eq!(config.slice_budget_ms, 50);
        assert_eq!(config.resume_delay_ms, 5);
        assert_eq!(config.check_interval, 1000);
    }

    #[test]
    fn test_parse_empty_toml() {
        assert_eq!(
            LoaderConfig::from_toml_str("").unwrap(),
            LoaderConfig::default()
        );
    }

    #[test]
    fn test_zero_check_interval_is_clamped() {
        let config = LoaderConfig::from_toml_str("check_interval = 0").unwrap();
        assert_eq!(config.check_interval(), 1);
    }

    #[test]
    fn test_invalid_toml() {
        let result = LoaderConfig::from_toml_str("slice_budget_ms = \"soon\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.toml");
        std::fs::write(&path, "resume_delay_ms = 1\ncheck_interval = 64\n").unwrap();

        let config = LoaderConfig::load(&path).unwrap();
        assert_eq!(config.resume_delay(), Duration::from_millis(1));
        assert_eq!(config.check_interval(), 64);
    }

    #[test]
    fn test_load_missing_file() {
        let result = LoaderConfig::load("/nonexistent/loader.toml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
