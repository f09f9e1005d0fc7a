//! Fee Estimation
//!
//! Sweep fee estimation against a wallet engine:
//! - Priority tiers understood by the engine's fee model
//! - Probe transactions shaped like the real sweep (N-1 outputs + change)
//! - The per-output fee model used by the ledger engine

use crate::core::sweep::SweepRequest;
use crate::wallet::engine::{EngineError, Output, WalletEngine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Constants
// =============================================================================

/// Amount carried by each output of a fee probe transaction (atomic units)
pub const PROBE_AMOUNT: u64 = 1;

/// Estimated size of a transaction without outputs (bytes)
pub const BASE_TX_SIZE: u64 = 1_500;

/// Estimated size added by each output, change included (bytes)
pub const OUTPUT_SIZE: u64 = 100;

/// Default fee rate (atomic units per byte)
pub const DEFAULT_FEE_PER_BYTE: u64 = 20;

// =============================================================================
// Priority
// =============================================================================

/// Transaction priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Default,
    Low,
    Medium,
    High,
}

impl Priority {
    /// Numeric tier as used by the engine (0 = default ... 3 = high)
    pub fn as_u32(&self) -> u32 {
        match self {
            Priority::Default => 0,
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Fee multiplier applied on top of the base fee
    pub fn fee_multiplier(&self) -> u64 {
        match self {
            Priority::Default | Priority::Low => 1,
            Priority::Medium => 5,
            Priority::High => 25,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Default => "default",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "0" => Ok(Priority::Default),
            "low" | "1" => Ok(Priority::Low),
            "medium" | "normal" | "2" => Ok(Priority::Medium),
            "high" | "3" => Ok(Priority::High),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

// =============================================================================
// Fee Model
// =============================================================================

/// Per-output fee model: the fee depends on the output count, never on amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeModel {
    /// Atomic units per byte at default priority
    pub fee_per_byte: u64,
}

impl FeeModel {
    pub fn new(fee_per_byte: u64) -> Self {
        Self { fee_per_byte }
    }

    /// Estimated size of a transaction with `output_count` outputs in total
    pub fn estimated_size(output_count: usize) -> u64 {
        BASE_TX_SIZE + OUTPUT_SIZE * output_count as u64
    }

    /// Fee for a transaction with exactly `output_count` outputs (no change)
    pub fn fee_for_output_count(&self, output_count: usize, priority: Priority) -> u64 {
        self.fee_per_byte
            .saturating_mul(Self::estimated_size(output_count))
            .saturating_mul(priority.fee_multiplier())
    }

    /// Fee for a transaction with `explicit_outputs` outputs plus change
    pub fn fee_for_outputs(&self, explicit_outputs: usize, priority: Priority) -> u64 {
        self.fee_for_output_count(explicit_outputs + 1, priority)
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_PER_BYTE)
    }
}

// =============================================================================
// Fee Estimator
// =============================================================================

/// Asks the engine for the fee of a sweep-shaped probe transaction
pub struct FeeEstimator<'a, E: WalletEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: WalletEngine + ?Sized> FeeEstimator<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Probe outputs for a sweep: every destination but the last, carrying
    /// `PROBE_AMOUNT` each. The last destination's slot is filled by the
    /// engine's implicit change output, so the shape matches the real sweep.
    pub fn probe_outputs(destinations: &[String]) -> Vec<Output> {
        let explicit = destinations.len().saturating_sub(1);
        destinations[..explicit]
            .iter()
            .map(|address| Output::new(address.clone(), PROBE_AMOUNT))
            .collect()
    }

    /// Estimate the fee of the sweep described by `request`
    pub fn estimate_sweep_fee(
        &self,
        request: &SweepRequest,
        priority: Priority,
    ) -> Result<u64, EngineError> {
        let probe = Self::probe_outputs(request.destinations());
        let fee = self.engine.estimate_fee(&probe, priority)?;

        log::debug!(
            "Estimated sweep fee {} for {} destination(s) at {} priority",
            fee,
            request.len(),
            priority
        );

        Ok(fee)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::engine::PendingTransaction;
    use std::cell::RefCell;

    /// Engine that records every fee query it receives
    struct ProbeRecorder {
        seen: RefCell<Vec<(Vec<Output>, Priority)>>,
        model: FeeModel,
    }

    impl ProbeRecorder {
        fn new() -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
                model: FeeModel::new(10),
            }
        }
    }

    impl WalletEngine for ProbeRecorder {
        fn unlocked_balance(&self) -> u64 {
            0
        }

        fn balance(&self) -> u64 {
            0
        }

        fn blockchain_height(&self) -> u64 {
            0
        }

        fn estimate_fee(&self, outputs: &[Output], priority: Priority) -> Result<u64, EngineError> {
            self.seen.borrow_mut().push((outputs.to_vec(), priority));
            Ok(self.model.fee_for_outputs(outputs.len(), priority))
        }

        fn create_transaction(
            &mut self,
            _outputs: &[Output],
            _payment_id: &str,
            _priority: Priority,
        ) -> Result<PendingTransaction, EngineError> {
            Err(EngineError::Unsupported("create_transaction".into()))
        }

        fn create_sweep_transaction(
            &mut self,
            _address: &str,
            _priority: Priority,
        ) -> Result<PendingTransaction, EngineError> {
            Err(EngineError::Unsupported("create_sweep_transaction".into()))
        }

        fn commit(&mut self, _tx: &PendingTransaction) -> Result<(), EngineError> {
            Err(EngineError::Unsupported("commit".into()))
        }

        fn tx_key(&self, _txid: &str) -> Option<String> {
            None
        }
    }

    fn request(addresses: &[&str]) -> SweepRequest {
        let n = addresses.len() as f64;
        let destinations = addresses.iter().map(|a| a.to_string()).collect();
        SweepRequest::new(destinations, vec![1.0 / n; addresses.len()]).unwrap()
    }

    #[test]
    fn test_probe_skips_last_destination() {
        let engine = ProbeRecorder::new();
        let estimator = FeeEstimator::new(&engine);

        estimator
            .estimate_sweep_fee(&request(&["A", "B", "C"]), Priority::Low)
            .unwrap();

        let seen = engine.seen.borrow();
        assert_eq!(seen.len(), 1);
        let (outputs, priority) = &seen[0];
        assert_eq!(*priority, Priority::Low);
        assert_eq!(
            outputs,
            &vec![Output::new("A", PROBE_AMOUNT), Output::new("B", PROBE_AMOUNT)]
        );
    }

    #[test]
    fn test_single_destination_probe_is_change_only() {
        let engine = ProbeRecorder::new();
        let fee = FeeEstimator::new(&engine)
            .estimate_sweep_fee(&request(&["A"]), Priority::Default)
            .unwrap();

        assert!(engine.seen.borrow()[0].0.is_empty());
        assert_eq!(fee, 10 * (BASE_TX_SIZE + OUTPUT_SIZE));
    }

    #[test]
    fn test_fee_model_ignores_amounts() {
        let model = FeeModel::default();
        let small = model.fee_for_outputs(2, Priority::Default);
        let again = model.fee_for_outputs(2, Priority::Default);
        assert_eq!(small, again);
        assert!(model.fee_for_outputs(3, Priority::Default) > small);
    }

    #[test]
    fn test_probe_shape_matches_full_sweep() {
        // N-1 outputs plus change costs the same as N outputs without change
        let model = FeeModel::new(7);
        for n in 1..6 {
            assert_eq!(
                model.fee_for_outputs(n - 1, Priority::High),
                model.fee_for_output_count(n, Priority::High)
            );
        }
    }

    #[test]
    fn test_fee_grows_with_priority() {
        let model = FeeModel::default();
        let default = model.fee_for_outputs(1, Priority::Default);
        let medium = model.fee_for_outputs(1, Priority::Medium);
        let high = model.fee_for_outputs(1, Priority::High);

        assert_eq!(default, model.fee_for_outputs(1, Priority::Low));
        assert!(medium > default);
        assert!(high > medium);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("2".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("normal".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(Priority::High.to_string(), "high");
        assert_eq!(Priority::High.as_u32(), 3);
    }
}
