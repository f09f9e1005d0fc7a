//! Ledger engine
//!
//! A local, file-backed [`WalletEngine`]. It keeps an unlocked and a locked
//! balance, prices transactions with a [`FeeModel`], hands out pending
//! transactions and debits the balance on commit. No keys, daemon or chain
//! are involved; it stands in for a real engine in the CLI and the tests.

use crate::core::fee::{FeeModel, Priority};
use crate::logging::host::{engine_log, Level, LogRegistry};
use crate::wallet::engine::{
    EngineError, Output, PendingStatus, PendingTransaction, StatusKind, WalletEngine,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Instant;

/// Logger used for the engine's own messages
const WALLET_LOGGER: &str = "wallet";

/// Logger used for the engine's timing messages
const PERF_LOGGER: &str = "PERF";

// =============================================================================
// Ledger State
// =============================================================================

/// A committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub txid: String,
    pub tx_key: String,
    pub outputs: Vec<Output>,
    pub payment_id: String,
    pub fee: u64,
    pub height: u64,
    pub committed_at: DateTime<Utc>,
}

/// Persistent state of the ledger engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub unlocked: u64,
    pub locked: u64,
    pub height: u64,
    pub fee_model: FeeModel,
    #[serde(default)]
    pub transactions: Vec<LedgerTransaction>,
    pub created_at: DateTime<Utc>,
}

impl LedgerState {
    pub fn new(unlocked: u64, locked: u64, fee_model: FeeModel) -> Self {
        Self {
            unlocked,
            locked,
            height: 1,
            fee_model,
            transactions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn find(&self, txid: &str) -> Option<&LedgerTransaction> {
        self.transactions.iter().find(|tx| tx.txid == txid)
    }
}

// =============================================================================
// Ledger Engine
// =============================================================================

/// File-backed wallet engine
pub struct LedgerEngine {
    state: LedgerState,
    logs: Arc<LogRegistry>,
}

impl LedgerEngine {
    /// Engine logging through the process-wide registry
    pub fn new(state: LedgerState) -> Self {
        Self::with_registry(state, LogRegistry::global())
    }

    pub fn with_registry(state: LedgerState, logs: Arc<LogRegistry>) -> Self {
        Self { state, logs }
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn into_state(self) -> LedgerState {
        self.state
    }

    /// Move all locked funds to the unlocked balance
    pub fn unlock_all(&mut self) -> u64 {
        let amount = self.state.locked;
        self.state.unlocked = self.state.unlocked.saturating_add(amount);
        self.state.locked = 0;
        engine_log!(self.logs, WALLET_LOGGER, Level::Info, "Unlocked {} atomic units", amount);
        amount
    }

    fn validate_outputs(outputs: &[Output]) -> Result<(), EngineError> {
        if let Some(index) = outputs.iter().position(|o| o.address.trim().is_empty()) {
            return Err(EngineError::InvalidOutput(format!(
                "output {} has an empty address",
                index
            )));
        }
        Ok(())
    }

    fn txid_for(&self, outputs: &[Output], payment_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.state.height.to_le_bytes());
        hasher.update(payment_id.as_bytes());
        for output in outputs {
            hasher.update(output.address.as_bytes());
            hasher.update(output.amount.to_le_bytes());
        }
        hasher.update(rand::random::<[u8; 16]>());
        hex::encode(hasher.finalize())
    }

    fn pending(
        &self,
        outputs: Vec<Output>,
        payment_id: &str,
        priority: Priority,
        fee: u64,
    ) -> PendingTransaction {
        PendingTransaction {
            status: PendingStatus::Ok,
            txids: vec![self.txid_for(&outputs, payment_id)],
            outputs,
            payment_id: payment_id.to_string(),
            priority,
            fee,
        }
    }

    fn not_enough_money(&self, needed: u128, priority: Priority) -> PendingTransaction {
        let message = format!(
            "not enough unlocked money: have {}, need {}",
            self.state.unlocked, needed
        );
        engine_log!(self.logs, WALLET_LOGGER, Level::Error, "{}", message);
        PendingTransaction::failed(StatusKind::Error, message, priority)
    }
}

impl WalletEngine for LedgerEngine {
    fn unlocked_balance(&self) -> u64 {
        self.state.unlocked
    }

    fn balance(&self) -> u64 {
        self.state.unlocked.saturating_add(self.state.locked)
    }

    fn blockchain_height(&self) -> u64 {
        self.state.height
    }

    fn estimate_fee(&self, outputs: &[Output], priority: Priority) -> Result<u64, EngineError> {
        Self::validate_outputs(outputs)?;
        let fee = self.state.fee_model.fee_for_outputs(outputs.len(), priority);
        engine_log!(
            self.logs,
            WALLET_LOGGER,
            Level::Debug,
            "Fee for {} output(s) + change at priority {}: {}",
            outputs.len(),
            priority.as_u32(),
            fee
        );
        Ok(fee)
    }

    fn create_transaction(
        &mut self,
        outputs: &[Output],
        payment_id: &str,
        priority: Priority,
    ) -> Result<PendingTransaction, EngineError> {
        let started = Instant::now();
        if outputs.is_empty() {
            return Err(EngineError::InvalidOutput("no outputs".into()));
        }
        Self::validate_outputs(outputs)?;
        if let Some(index) = outputs.iter().position(|o| o.amount == 0) {
            return Err(EngineError::InvalidOutput(format!(
                "output {} has a zero amount",
                index
            )));
        }

        let total: u128 = outputs.iter().map(|o| o.amount as u128).sum();
        let unlocked = self.state.unlocked as u128;
        let model = self.state.fee_model;

        // A change output is only added when something is left over
        let exact_fee = model.fee_for_output_count(outputs.len(), priority);
        let fee = if total + exact_fee as u128 == unlocked {
            exact_fee
        } else {
            model.fee_for_outputs(outputs.len(), priority)
        };

        if total + fee as u128 > unlocked {
            return Ok(self.not_enough_money(total + fee as u128, priority));
        }

        let pending = self.pending(outputs.to_vec(), payment_id, priority, fee);
        engine_log!(
            self.logs,
            WALLET_LOGGER,
            Level::Info,
            "Created transaction {} with {} output(s), fee {}",
            pending.txid(),
            outputs.len(),
            fee
        );
        engine_log!(
            self.logs,
            PERF_LOGGER,
            Level::Info,
            "PERF {:>8}us create_transaction",
            started.elapsed().as_micros()
        );
        Ok(pending)
    }

    fn create_sweep_transaction(
        &mut self,
        address: &str,
        priority: Priority,
    ) -> Result<PendingTransaction, EngineError> {
        Self::validate_outputs(&[Output::new(address, 0)])?;

        let fee = self.state.fee_model.fee_for_output_count(1, priority);
        if self.state.unlocked <= fee {
            return Ok(self.not_enough_money(fee as u128 + 1, priority));
        }

        let output = Output::new(address, self.state.unlocked - fee);
        let pending = self.pending(vec![output], "", priority, fee);
        engine_log!(
            self.logs,
            WALLET_LOGGER,
            Level::Info,
            "Created sweep transaction {} to {}",
            pending.txid(),
            address
        );
        Ok(pending)
    }

    fn commit(&mut self, tx: &PendingTransaction) -> Result<(), EngineError> {
        tx.check_error()?;

        let txid = tx.txid().to_string();
        if txid.is_empty() {
            return Err(EngineError::UnknownTransaction("<empty txid>".into()));
        }
        if self.state.find(&txid).is_some() {
            return Err(EngineError::AlreadyCommitted(txid));
        }

        let debit = tx.amount().checked_add(tx.fee).ok_or_else(|| EngineError::Status {
            kind: StatusKind::Critical,
            message: "transaction amount overflows".into(),
        })?;
        if debit > self.state.unlocked {
            return Err(EngineError::Status {
                kind: StatusKind::Error,
                message: format!(
                    "balance changed: have {}, need {}",
                    self.state.unlocked, debit
                ),
            });
        }

        self.state.unlocked -= debit;
        self.state.transactions.push(LedgerTransaction {
            txid: txid.clone(),
            tx_key: hex::encode(rand::random::<[u8; 32]>()),
            outputs: tx.outputs.clone(),
            payment_id: tx.payment_id.clone(),
            fee: tx.fee,
            height: self.state.height,
            committed_at: Utc::now(),
        });
        self.state.height += 1;

        engine_log!(
            self.logs,
            WALLET_LOGGER,
            Level::Info,
            "Committed transaction {} ({} + fee {})",
            txid,
            tx.amount(),
            tx.fee
        );
        Ok(())
    }

    fn tx_key(&self, txid: &str) -> Option<String> {
        self.state.find(txid).map(|tx| tx.tx_key.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
