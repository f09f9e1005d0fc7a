//! Configuration
//!
//! `SweepConfig` is read from `<data_dir>/config.json` when present. Missing
//! fields fall back to their defaults; CLI flags override what is loaded.

use crate::core::fee::{Priority, DEFAULT_FEE_PER_BYTE};
use crate::logging::DEFAULT_CHANNEL;
use crate::storage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Data directory for the ledger and backups
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
    /// Priority used when a command does not give one
    pub priority: Priority,
    /// `log` target for forwarded engine messages
    pub log_channel: String,
    /// Filter passed to env_logger when RUST_LOG is unset
    pub log_filter: String,
    /// Fee rate of newly created ledgers
    pub fee_per_byte: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let storage = StorageConfig::default();
        Self {
            data_dir: storage.data_dir,
            ledger_file: storage.ledger_file,
            backup_enabled: storage.backup_enabled,
            max_backups: storage.max_backups,
            priority: Priority::Default,
            log_channel: DEFAULT_CHANNEL.to_string(),
            log_filter: "info".to_string(),
            fee_per_byte: DEFAULT_FEE_PER_BYTE,
        }
    }
}

impl SweepConfig {
    /// Load from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Location of the configuration file for `data_dir`
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE)
    }

    /// Load `<data_dir>/config.json` if it exists, defaults otherwise.
    /// `data_dir` always wins over the value stored in the file.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(data_dir);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            data_dir: self.data_dir.clone(),
            ledger_file: self.ledger_file.clone(),
            backup_enabled: self.backup_enabled,
            max_backups: self.max_backups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = SweepConfig::load(temp_dir.path()).unwrap();

        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(SweepConfig::path(temp_dir.path()), temp_dir.path().join("config.json"));
        assert_eq!(config.priority, Priority::Default);
        assert_eq!(config.log_channel, DEFAULT_CHANNEL);
        assert_eq!(config.fee_per_byte, DEFAULT_FEE_PER_BYTE);
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE),
            r#"{ "priority": "high", "log_channel": "engine", "max_backups": 2 }"#,
        )
        .unwrap();

        let config = SweepConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.priority, Priority::High);
        assert_eq!(config.log_channel, "engine");
        assert_eq!(config.max_backups, 2);
        assert_eq!(config.ledger_file, "ledger.json");
        assert_eq!(config.storage_config().max_backups, 2);
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE), r#"{ "priority": "urgent" }"#).unwrap();

        assert!(matches!(
            SweepConfig::load(temp_dir.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
