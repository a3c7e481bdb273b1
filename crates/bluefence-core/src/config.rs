//! Scanner configuration.
//!
//! Loaded from a TOML file; every field has a default and a missing or
//! unreadable file degrades to the defaults rather than failing startup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration load errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Runtime configuration for the classification core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the device ledgers and exports.
    pub data_dir: PathBuf,
    /// Operator identity recorded on manual flag entries.
    pub operator: String,
    /// Process repeated advertisements for the same address.
    pub allow_duplicates: bool,
    /// Append a per-event JSON line to `discovery.log` in the data dir.
    pub log_discoveries: bool,
    /// Restrict discovery to these service identifiers (empty = all).
    pub services: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            operator: "ALPHA-7".to_string(),
            allow_duplicates: true,
            log_discoveries: false,
            services: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Load configuration, falling back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }
}
