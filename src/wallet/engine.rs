//! Wallet engine interface
//!
//! The engine owns balances, fee estimation and transaction construction.
//! Everything else in the crate reaches it through [`WalletEngine`].

use crate::core::fee::Priority;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors reported by a wallet engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid output: {0}")]
    InvalidOutput(String),
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),
    #[error("Transaction already committed: {0}")]
    AlreadyCommitted(String),
    #[error("Engine error ({kind}): {message}")]
    Status { kind: StatusKind, message: String },
    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

// =============================================================================
// Outputs
// =============================================================================

/// A single transaction output (destination address and amount)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: String,
    pub amount: u64,
}

impl Output {
    pub fn new(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

// =============================================================================
// Pending Transaction
// =============================================================================

/// Severity of a failed engine status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusKind {
    Error,
    Critical,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusKind::Error => f.write_str("error"),
            StatusKind::Critical => f.write_str("critical"),
        }
    }
}

/// Status of a pending transaction: 0 = ok, 1 = error, 2 = critical
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingStatus {
    Ok,
    Failed { kind: StatusKind, message: String },
}

impl PendingStatus {
    pub fn code(&self) -> i32 {
        match self {
            PendingStatus::Ok => 0,
            PendingStatus::Failed {
                kind: StatusKind::Error,
                ..
            } => 1,
            PendingStatus::Failed {
                kind: StatusKind::Critical,
                ..
            } => 2,
        }
    }
}

/// A constructed but not yet committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub status: PendingStatus,
    pub txids: Vec<String>,
    pub outputs: Vec<Output>,
    pub payment_id: String,
    pub priority: Priority,
    pub fee: u64,
}

impl PendingTransaction {
    /// A failed transaction carrying the engine's error message
    pub fn failed(kind: StatusKind, message: impl Into<String>, priority: Priority) -> Self {
        Self {
            status: PendingStatus::Failed {
                kind,
                message: message.into(),
            },
            txids: Vec::new(),
            outputs: Vec::new(),
            payment_id: String::new(),
            priority,
            fee: 0,
        }
    }

    /// Sum of output amounts, fee excluded
    pub fn amount(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    /// First transaction id, empty if the engine produced none
    pub fn txid(&self) -> &str {
        self.txids.first().map(String::as_str).unwrap_or("")
    }

    /// Return `Ok` when the pending transaction is ok, otherwise its error
    pub fn check_error(&self) -> Result<(), EngineError> {
        match &self.status {
            PendingStatus::Ok => Ok(()),
            PendingStatus::Failed { kind, message } => Err(EngineError::Status {
                kind: *kind,
                message: message.clone(),
            }),
        }
    }
}

// =============================================================================
// Engine Trait
// =============================================================================

/// Query and construction primitives of a wallet engine
pub trait WalletEngine {
    /// Spendable balance (atomic units)
    fn unlocked_balance(&self) -> u64;

    /// Total balance including locked funds (atomic units)
    fn balance(&self) -> u64;

    /// Current wallet height
    fn blockchain_height(&self) -> u64;

    /// Fee of a transaction paying `outputs` plus an implicit change output
    fn estimate_fee(&self, outputs: &[Output], priority: Priority) -> Result<u64, EngineError>;

    /// Construct a transaction paying `outputs`. Construction failures may be
    /// reported through the pending transaction's status instead of `Err`.
    fn create_transaction(
        &mut self,
        outputs: &[Output],
        payment_id: &str,
        priority: Priority,
    ) -> Result<PendingTransaction, EngineError>;

    /// Construct a transaction sending the whole unlocked balance to `address`
    fn create_sweep_transaction(
        &mut self,
        address: &str,
        priority: Priority,
    ) -> Result<PendingTransaction, EngineError>;

    /// Commit a pending transaction
    fn commit(&mut self, tx: &PendingTransaction) -> Result<(), EngineError>;

    /// Transaction key of a committed transaction
    fn tx_key(&self, txid: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_status_codes() {
        let ok = PendingTransaction {
            status: PendingStatus::Ok,
            txids: vec!["aa".into(), "bb".into()],
            outputs: vec![Output::new("A", 5), Output::new("B", 7)],
            payment_id: String::new(),
            priority: Priority::Default,
            fee: 1,
        };
        assert_eq!(ok.status.code(), 0);
        assert!(ok.check_error().is_ok());
        assert_eq!(ok.amount(), 12);
        assert_eq!(ok.txid(), "aa");

        let critical = PendingTransaction::failed(StatusKind::Critical, "boom", Priority::High);
        assert_eq!(critical.status.code(), 2);
        assert_eq!(critical.txid(), "");
        assert_eq!(
            critical.check_error().unwrap_err().to_string(),
            "Engine error (critical): boom"
        );
    }
}
