//! Pipeline configuration.
//!
//! Settings come from three layers, later ones winning:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables (`DB_PATH`, `ALPHAVANTAGE_API_KEY`, `TASKMASTER_LOOKBACK`)
//!
//! The environment is read through a caller-supplied lookup so nothing in the
//! library touches process-global state; the binary passes `std::env::var`.

use crate::indicators::SMA_PERIOD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DB_PATH_VAR: &str = "DB_PATH";
pub const API_KEY_VAR: &str = "ALPHAVANTAGE_API_KEY";
pub const LOOKBACK_VAR: &str = "TASKMASTER_LOOKBACK";

pub const DEFAULT_DB_PATH: &str = "taskmaster.db";
pub const DEFAULT_LOOKBACK: usize = 100;
/// About twenty years of trading days.
pub const MAX_LOOKBACK: usize = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the pipeline needs, passed explicitly to `Pipeline::new`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Provider credential, if the configured provider needs one.
    pub api_key: Option<String>,
    /// Trading days requested from the provider per ticker.
    pub lookback: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            api_key: None,
            lookback: DEFAULT_LOOKBACK,
        }
    }
}

// Hand-written so the credential never lands in logs.
impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("db_path", &self.db_path)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("lookback", &self.lookback)
            .finish()
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults overlaid with whatever `lookup` returns for the known variables.
    pub fn from_env<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_env(lookup)
    }

    /// Overlay environment values on top of `self`. Empty values are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = var(DB_PATH_VAR) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(key) = var(API_KEY_VAR) {
            self.api_key = Some(key);
        }
        if let Some(raw) = var(LOOKBACK_VAR) {
            self.lookback = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{LOOKBACK_VAR} must be a positive integer, got '{raw}'"))
            })?;
        }

        self.validate()?;
        Ok(self)
    }

    /// The lookback must cover at least one full SMA window and stay within
    /// what providers serve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(SMA_PERIOD..=MAX_LOOKBACK).contains(&self.lookback) {
            return Err(ConfigError::Invalid(format!(
                "lookback must be between {SMA_PERIOD} and {MAX_LOOKBACK} trading days, got {}",
                self.lookback
            )));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path must not be empty".into()));
        }
        Ok(())
    }
}
