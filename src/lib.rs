//! Wallet-Sweep: proportional multi-destination sweeps in Rust
//!
//! This crate provides:
//! - Proportional partitioning of an unlocked balance with exact fee accounting
//! - Sweep fee estimation through a probe transaction
//! - A wallet layer that plans, creates, checks and commits transactions
//! - A file-backed ledger engine with JSON persistence and backups
//! - A bridge forwarding the engine's native log output into `log`
//!
//! # Example
//!
//! ```rust
//! use wallet_sweep::core::plan_sweep;
//!
//! let destinations = vec!["A".to_string(), "B".to_string(), "C".to_string()];
//! let plan = plan_sweep(&destinations, &[0.5, 0.3, 0.2], 1_000_000, 1_000).unwrap();
//!
//! let amounts: Vec<u64> = plan.outputs().iter().map(|o| o.amount).collect();
//! assert_eq!(amounts, vec![499_500, 299_700, 199_800]);
//! assert_eq!(plan.total() + plan.fee, 1_000_000);
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod logging;
pub mod storage;
pub mod wallet;

// Re-export commonly used types
pub use config::SweepConfig;
pub use core::{plan_sweep, FeeEstimator, FeeModel, Priority, SweepError, SweepPlan, SweepRequest};
pub use logging::{LogBridge, LogRegistry};
pub use storage::{Storage, StorageConfig};
pub use wallet::{LedgerEngine, LedgerState, Output, TxReceipt, Wallet, WalletEngine, WalletError};
