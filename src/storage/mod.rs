//! Storage module for ledger persistence

pub mod persistence;

pub use persistence::{Backup, Storage, StorageConfig, StorageError};
