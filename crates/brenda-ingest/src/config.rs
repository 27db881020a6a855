//! Ingestion configuration
//!
//! Paths and tuning knobs for one mirror rebuild. The CLI fills this from
//! its arguments; [`IngestConfig::from_env`] covers library callers.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::brenda::{
    IngestError, Result, DEFAULT_BATCH_SIZE, DEFAULT_CHANNEL_CAPACITY, DEFAULT_PROGRESS_INTERVAL,
    MAX_BATCH_SIZE,
};

/// Default location of the JSON release
pub const DEFAULT_JSON_PATH: &str = "data/raw/brenda_2025_1.json";

/// Default location of the flat-file release
pub const DEFAULT_TEXT_PATH: &str = "data/raw/brenda_2025_1.txt";

/// Default location of the mirror database
pub const DEFAULT_TARGET_PATH: &str = "data/processed/brenda.db";

/// Configuration of one rebuild
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// JSON release (plain or `.gz`)
    pub json_path: PathBuf,
    /// Flat-file release (plain or `.gz`)
    pub text_path: PathBuf,
    /// SQLite file to (re)build
    pub target_path: PathBuf,
    /// Rows per insert transaction
    pub batch_size: usize,
    /// Parsed records buffered between a reader and the pipeline
    pub channel_capacity: usize,
    /// Log a progress line every N records (0 disables)
    pub progress_interval: u64,
    /// Show a terminal spinner
    pub show_progress: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            json_path: PathBuf::from(DEFAULT_JSON_PATH),
            text_path: PathBuf::from(DEFAULT_TEXT_PATH),
            target_path: PathBuf::from(DEFAULT_TARGET_PATH),
            batch_size: DEFAULT_BATCH_SIZE,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            show_progress: false,
        }
    }
}

impl IngestConfig {
    pub fn new(
        json_path: impl Into<PathBuf>,
        text_path: impl Into<PathBuf>,
        target_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            json_path: json_path.into(),
            text_path: text_path.into(),
            target_path: target_path.into(),
            ..Default::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Load configuration from environment variables
    ///
    /// Reads `BRENDA_JSON`, `BRENDA_TEXT`, `BRENDA_DB`, `BRENDA_BATCH_SIZE`,
    /// `BRENDA_CHANNEL_CAPACITY` and `BRENDA_PROGRESS_INTERVAL`, after
    /// loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            json_path: env_path("BRENDA_JSON").unwrap_or(defaults.json_path),
            text_path: env_path("BRENDA_TEXT").unwrap_or(defaults.text_path),
            target_path: env_path("BRENDA_DB").unwrap_or(defaults.target_path),
            batch_size: env_number("BRENDA_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            channel_capacity: env_number("BRENDA_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.channel_capacity),
            progress_interval: env_number("BRENDA_PROGRESS_INTERVAL")?
                .unwrap_or(defaults.progress_interval),
            show_progress: defaults.show_progress,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(IngestError::Config(format!(
                "batch size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.batch_size
            )));
        }
        if self.channel_capacity == 0 {
            return Err(IngestError::Config(
                "channel capacity must be greater than 0".to_string(),
            ));
        }
        if self.json_path == self.target_path || self.text_path == self.target_path {
            return Err(IngestError::Config(format!(
                "target {} would overwrite a source file",
                self.target_path.display()
            )));
        }
        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestError::Config(format!("{key} is not a valid number: {value:?}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = IngestConfig::default();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.target_path, PathBuf::from("data/processed/brenda.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_bounds() {
        let config = IngestConfig::default().with_batch_size(0);
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));

        let config = IngestConfig::default().with_batch_size(MAX_BATCH_SIZE + 1);
        assert!(config.validate().is_err());

        let config = IngestConfig::default().with_batch_size(MAX_BATCH_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_must_differ_from_sources() {
        let config = IngestConfig::new("a.json", "b.txt", "a.json");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("would overwrite a source file"));
    }
}
