//! Wallet module for engine access and transaction publishing

pub mod engine;
pub mod ledger;
pub mod wallet;

pub use engine::{EngineError, Output, PendingStatus, PendingTransaction, StatusKind, WalletEngine};
pub use ledger::{LedgerEngine, LedgerState, LedgerTransaction};
pub use wallet::{TxReceipt, Wallet, WalletError};
