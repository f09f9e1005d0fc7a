//! Wallet implementation
//!
//! Wraps a [`WalletEngine`] and provides transfers, single-destination sweeps
//! and proportional multi-destination sweeps.

use crate::core::fee::{FeeEstimator, Priority};
use crate::core::sweep::{SweepError, SweepPlan, SweepRequest};
use crate::wallet::engine::{EngineError, Output, PendingTransaction, WalletEngine};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Sweep rejected: {0}")]
    Sweep(#[from] SweepError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Failed to create transaction: {0}")]
    PendingTransaction(EngineError),
    #[error("Failed to commit transaction {txid}: {source}")]
    Commit { txid: String, source: EngineError },
    #[error("No transaction key for {0}")]
    MissingTxKey(String),
}

/// A receipt returned after successfully committing a transaction.
/// Contains what is needed to prove the transfer later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub txid: String,
    pub tx_key: String,
    pub height: u64,
    pub outputs: Vec<Output>,
    pub fee: u64,
}

/// A wallet on top of an engine
pub struct Wallet<E: WalletEngine> {
    engine: E,
    /// Priority used when none is given explicitly
    pub default_priority: Priority,
}

impl<E: WalletEngine> Wallet<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            default_priority: Priority::Default,
        }
    }

    pub fn with_priority(engine: E, priority: Priority) -> Self {
        Self {
            engine,
            default_priority: priority,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Spendable balance in atomic units
    pub fn unlocked_balance(&self) -> u64 {
        self.engine.unlocked_balance()
    }

    /// Total balance including locked funds
    pub fn total_balance(&self) -> u64 {
        self.engine.balance()
    }

    pub fn blockchain_height(&self) -> u64 {
        self.engine.blockchain_height()
    }

    /// Fee the engine would charge for a proportional sweep to `destinations`
    pub fn estimate_sweep_fee(
        &self,
        destinations: &[String],
        ratios: &[f64],
        priority: Priority,
    ) -> Result<u64, WalletError> {
        let request = SweepRequest::new(destinations.to_vec(), ratios.to_vec())?;
        Ok(FeeEstimator::new(&self.engine).estimate_sweep_fee(&request, priority)?)
    }

    /// Validate, estimate the fee and partition the unlocked balance
    pub fn plan_sweep(
        &self,
        destinations: &[String],
        ratios: &[f64],
        priority: Priority,
    ) -> Result<SweepPlan, WalletError> {
        let request = SweepRequest::new(destinations.to_vec(), ratios.to_vec())?;
        let fee = FeeEstimator::new(&self.engine).estimate_sweep_fee(&request, priority)?;
        let unlocked = self.engine.unlocked_balance();

        let plan = request.partition(unlocked, fee)?;
        log::debug!(
            "Planned sweep of {} to {} destination(s), fee {}",
            plan.sweepable,
            plan.len(),
            fee
        );
        Ok(plan)
    }

    /// Sweep the whole unlocked balance to `destinations`, split by `ratios`.
    /// The last destination receives the rounding residue.
    pub fn sweep_multi(
        &mut self,
        destinations: &[String],
        ratios: &[f64],
        priority: Priority,
    ) -> Result<TxReceipt, WalletError> {
        let plan = self.plan_sweep(destinations, ratios, priority)?;

        log::info!(
            "Sweeping {} atomic units to {} destination(s)",
            plan.sweepable,
            plan.len()
        );

        let pending = self
            .engine
            .create_transaction(plan.outputs(), "", priority)?;
        self.publish(pending)
    }

    /// Transfer `amount` to `address` and return a receipt
    pub fn transfer(&mut self, address: &str, amount: u64) -> Result<TxReceipt, WalletError> {
        let outputs = [Output::new(address, amount)];
        let pending = self
            .engine
            .create_transaction(&outputs, "", self.default_priority)?;
        self.publish(pending)
    }

    /// Sweep all unlocked funds to `address`. Returns the transaction ids.
    pub fn sweep(&mut self, address: &str) -> Result<Vec<String>, WalletError> {
        let pending = self
            .engine
            .create_sweep_transaction(address, self.default_priority)?;
        let txids = pending.txids.clone();
        self.publish(pending)?;
        Ok(txids)
    }

    /// Check the pending transaction, commit it and build the receipt
    fn publish(&mut self, pending: PendingTransaction) -> Result<TxReceipt, WalletError> {
        pending
            .check_error()
            .map_err(WalletError::PendingTransaction)?;

        // Read the txid before committing, the engine may clear it afterwards
        let txid = pending.txid().to_string();
        let height = self.engine.blockchain_height();

        self.engine
            .commit(&pending)
            .map_err(|source| WalletError::Commit {
                txid: txid.clone(),
                source,
            })?;

        let tx_key = self
            .engine
            .tx_key(&txid)
            .ok_or_else(|| WalletError::MissingTxKey(txid.clone()))?;

        log::info!("Published transaction {}", txid);

        Ok(TxReceipt {
            txid,
            tx_key,
            height,
            outputs: pending.outputs,
            fee: pending.fee,
        })
    }
}
