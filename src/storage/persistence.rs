//! Ledger persistence
//!
//! The ledger lives in one JSON file inside the data directory. Every save
//! first pushes the current file onto a bounded stack of numbered backups
//! (`<ledger_file>.backup.0` is the most recent), so a bad sweep can be rolled
//! back with [`Storage::restore`].

use crate::wallet::ledger::LedgerState;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("No ledger at {0:?}")]
    MissingLedger(PathBuf),
    #[error("Backup {0} not found")]
    MissingBackup(usize),
}

/// Where and how the ledger is stored
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub ledger_file: String,
    pub backup_enabled: bool,
    /// Number of backups kept; older ones are dropped
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".sweep_data"),
            ledger_file: "ledger.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// A backup slot together with the ledger it holds
#[derive(Debug, Clone, PartialEq)]
pub struct Backup {
    pub index: usize,
    pub ledger: LedgerState,
}

/// Reads and writes the ledger file and its backups
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Open the data directory, creating it if needed
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.ledger_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let name = format!("{}.backup.{}", self.config.ledger_file, index);
        self.config.data_dir.join(name)
    }

    fn keeps_backups(&self) -> bool {
        self.config.backup_enabled && self.config.max_backups > 0
    }

    pub fn exists(&self) -> bool {
        self.ledger_path().exists()
    }

    /// Write `ledger` as the current ledger, backing up the previous one
    pub fn save(&self, ledger: &LedgerState) -> Result<(), StorageError> {
        let path = self.ledger_path();
        if self.keeps_backups() && path.exists() {
            self.push_backup(&path)?;
        }

        let staging = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer_pretty(&mut writer, ledger)?;
            writer.flush()?;
        }
        fs::rename(&staging, &path)?;

        log::debug!("Saved ledger to {:?} (height {})", path, ledger.height);
        Ok(())
    }

    pub fn load(&self) -> Result<LedgerState, StorageError> {
        let path = self.ledger_path();
        if !path.exists() {
            return Err(StorageError::MissingLedger(path));
        }
        read_ledger(&path)
    }

    /// Backups from most recent (index 0) to oldest
    pub fn backups(&self) -> Result<Vec<Backup>, StorageError> {
        let mut backups = Vec::new();
        for index in 0..self.config.max_backups {
            let path = self.backup_path(index);
            if path.exists() {
                backups.push(Backup {
                    index,
                    ledger: read_ledger(&path)?,
                });
            }
        }
        Ok(backups)
    }

    /// Make backup `index` the current ledger. The ledger being replaced
    /// becomes backup 0, so a restore can itself be undone.
    pub fn restore(&self, index: usize) -> Result<LedgerState, StorageError> {
        let path = self.backup_path(index);
        if index >= self.config.max_backups || !path.exists() {
            return Err(StorageError::MissingBackup(index));
        }

        let ledger = read_ledger(&path)?;
        self.save(&ledger)?;

        log::info!("Restored ledger from backup {}", index);
        Ok(ledger)
    }

    /// Shift backups up one slot, dropping the oldest, and copy `current`
    /// into slot 0
    fn push_backup(&self, current: &Path) -> Result<(), StorageError> {
        let last = self.config.max_backups - 1;
        for index in (0..last).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::copy(current, self.backup_path(0))?;
        Ok(())
    }
}

fn read_ledger(path: &Path) -> Result<LedgerState, StorageError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fee::FeeModel;

    fn storage(dir: &tempfile::TempDir, max_backups: usize) -> Storage {
        let config = StorageConfig {
            data_dir: dir.path().to_path_buf(),
            max_backups,
            ..Default::default()
        };
        Storage::new(config).unwrap()
    }

    #[test]
    fn test_save_load_ledger() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 5);
        let ledger = LedgerState::new(1_000, 250, FeeModel::new(3));

        assert!(!storage.exists());
        storage.save(&ledger).unwrap();
        assert!(storage.exists());
        assert_eq!(storage.load().unwrap(), ledger);
        assert!(storage.backups().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 5);
        assert!(matches!(storage.load(), Err(StorageError::MissingLedger(_))));
    }

    #[test]
    fn test_backups_are_bounded_and_ordered() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 3);
        let mut ledger = LedgerState::new(0, 0, FeeModel::default());

        for unlocked in 0..5 {
            ledger.unlocked = unlocked;
            storage.save(&ledger).unwrap();
        }

        let backups = storage.backups().unwrap();
        let indexes: Vec<usize> = backups.iter().map(|b| b.index).collect();
        let balances: Vec<u64> = backups.iter().map(|b| b.ledger.unlocked).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(balances, vec![3, 2, 1]);
    }

    #[test]
    fn test_restore_can_be_undone() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 5);
        let mut ledger = LedgerState::new(500, 0, FeeModel::default());
        storage.save(&ledger).unwrap();
        ledger.unlocked = 0;
        storage.save(&ledger).unwrap();

        let restored = storage.restore(0).unwrap();
        assert_eq!(restored.unlocked, 500);
        assert_eq!(storage.load().unwrap().unlocked, 500);

        // The emptied ledger was pushed to slot 0 by the restore
        assert_eq!(storage.restore(0).unwrap().unlocked, 0);
    }

    #[test]
    fn test_restore_missing_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = storage(&temp_dir, 2);
        storage
            .save(&LedgerState::new(1, 0, FeeModel::default()))
            .unwrap();

        assert!(matches!(storage.restore(0), Err(StorageError::MissingBackup(0))));
        assert!(matches!(storage.restore(7), Err(StorageError::MissingBackup(7))));
    }

    #[test]
    fn test_backups_disabled() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            backup_enabled: false,
            ..Default::default()
        })
        .unwrap();

        let ledger = LedgerState::new(1, 0, FeeModel::default());
        storage.save(&ledger).unwrap();
        storage.save(&ledger).unwrap();
        assert!(storage.backups().unwrap().is_empty());
    }
}
