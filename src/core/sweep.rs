//! Proportional sweep planning
//!
//! Splits a wallet's sweepable balance (unlocked balance minus fee) across
//! several destinations by ratio. Amounts are integers: every destination but
//! the last gets `floor(sweepable * ratio)`, the last one takes the residue,
//! so the plan always sums to exactly `unlocked - fee`.

use crate::wallet::engine::Output;
use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum distance of the ratio sum from 1.0
pub const RATIO_TOLERANCE: f64 = 1e-6;

// =============================================================================
// Error Types
// =============================================================================

/// Reasons a sweep plan is rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SweepError {
    #[error("No destinations given")]
    EmptyDestinationSet,
    #[error("Ratio count mismatch: {destinations} destination(s), {ratios} ratio(s)")]
    RatioCountMismatch { destinations: usize, ratios: usize },
    #[error("Ratios sum to {sum}, expected 1.0 (tolerance {})", RATIO_TOLERANCE)]
    RatiosDoNotSumToOne { sum: f64 },
    #[error("Insufficient balance: unlocked {unlocked}, fee {fee}")]
    InsufficientBalance { unlocked: u64, fee: u64 },
    #[error("Destination {index} ({address}) would receive zero")]
    ZeroAmountDestination { index: usize, address: String },
    #[error("Partition integrity failure: outputs sum to {allocated}, expected {sweepable}")]
    PartitionIntegrityFailure { allocated: u128, sweepable: u64 },
}

// =============================================================================
// Sweep Request
// =============================================================================

/// Validated destinations and ratios of a sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRequest {
    destinations: Vec<String>,
    ratios: Vec<f64>,
}

impl SweepRequest {
    /// Validate shape and ratio sum. Checks run in order and the first
    /// failure is returned.
    pub fn new(destinations: Vec<String>, ratios: Vec<f64>) -> Result<Self, SweepError> {
        if destinations.is_empty() {
            return Err(SweepError::EmptyDestinationSet);
        }

        if ratios.len() != destinations.len() {
            return Err(SweepError::RatioCountMismatch {
                destinations: destinations.len(),
                ratios: ratios.len(),
            });
        }

        let sum: f64 = ratios.iter().sum();
        // Written negated so a NaN sum is rejected too
        if !((sum - 1.0).abs() <= RATIO_TOLERANCE) {
            return Err(SweepError::RatiosDoNotSumToOne { sum });
        }

        Ok(Self {
            destinations,
            ratios,
        })
    }

    pub fn destinations(&self) -> &[String] {
        &self.destinations
    }

    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    /// Partition `unlocked_balance - fee` across the destinations
    pub fn partition(&self, unlocked_balance: u64, fee: u64) -> Result<SweepPlan, SweepError> {
        if unlocked_balance < fee {
            return Err(SweepError::InsufficientBalance {
                unlocked: unlocked_balance,
                fee,
            });
        }
        let sweepable = unlocked_balance - fee;

        let last = self.destinations.len() - 1;
        let mut amounts = Vec::with_capacity(self.destinations.len());
        let mut allocated: u64 = 0;

        for (index, ratio) in self.ratios[..last].iter().enumerate() {
            // `as` saturates: negative and NaN products become 0
            let amount = (sweepable as f64 * ratio).floor() as u64;
            if amount == 0 {
                return Err(self.zero_amount(index));
            }
            allocated = allocated.checked_add(amount).ok_or_else(|| {
                SweepError::PartitionIntegrityFailure {
                    allocated: allocated as u128 + amount as u128,
                    sweepable,
                }
            })?;
            amounts.push(amount);
        }

        let residue = sweepable.checked_sub(allocated).ok_or(
            SweepError::PartitionIntegrityFailure {
                allocated: allocated as u128,
                sweepable,
            },
        )?;
        if residue == 0 {
            return Err(self.zero_amount(last));
        }
        amounts.push(residue);

        let total: u128 = amounts.iter().map(|a| *a as u128).sum();
        if total != sweepable as u128 {
            return Err(SweepError::PartitionIntegrityFailure {
                allocated: total,
                sweepable,
            });
        }

        let outputs = self
            .destinations
            .iter()
            .zip(amounts)
            .map(|(address, amount)| Output::new(address.clone(), amount))
            .collect();

        Ok(SweepPlan {
            outputs,
            fee,
            sweepable,
        })
    }

    fn zero_amount(&self, index: usize) -> SweepError {
        SweepError::ZeroAmountDestination {
            index,
            address: self.destinations[index].clone(),
        }
    }
}

// =============================================================================
// Sweep Plan
// =============================================================================

/// Outputs of a sweep, in destination order, summing to exactly `sweepable`.
/// Only the planner builds one; it is serialized for display but never read back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepPlan {
    outputs: Vec<Output>,
    /// Fee the plan was computed against
    pub fee: u64,
    /// Unlocked balance minus fee
    pub sweepable: u64,
}

impl SweepPlan {
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<Output> {
        self.outputs
    }

    /// Sum of all output amounts
    pub fn total(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Validate a sweep and partition `unlocked_balance - fee_estimate` across
/// `destinations` according to `ratios`
pub fn plan_sweep(
    destinations: &[String],
    ratios: &[f64],
    unlocked_balance: u64,
    fee_estimate: u64,
) -> Result<SweepPlan, SweepError> {
    SweepRequest::new(destinations.to_vec(), ratios.to_vec())?
        .partition(unlocked_balance, fee_estimate)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_three_way_split() {
        let plan = plan_sweep(&addrs(&["A", "B", "C"]), &[0.5, 0.3, 0.2], 1_000_000, 1_000)
            .unwrap();

        let amounts: Vec<u64> = plan.outputs().iter().map(|o| o.amount).collect();
        assert_eq!(amounts, vec![499_500, 299_700, 199_800]);
        assert_eq!(plan.total(), 999_000);
        assert_eq!(plan.sweepable, 999_000);
        assert_eq!(plan.fee, 1_000);
        assert_eq!(plan.outputs()[2].address, "C");
    }

    #[test]
    fn test_plan_json_shape() {
        let plan = plan_sweep(&addrs(&["A", "B"]), &[0.25, 0.75], 10_100, 100).unwrap();
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["fee"], 100);
        assert_eq!(json["sweepable"], 10_000);
        assert_eq!(json["outputs"][0]["address"], "A");
        assert_eq!(json["outputs"][0]["amount"], 2_500);
        assert_eq!(json["outputs"][1]["amount"], 7_500);
    }

    #[test]
    fn test_empty_destinations() {
        assert_eq!(
            plan_sweep(&[], &[1.0], 100, 1),
            Err(SweepError::EmptyDestinationSet)
        );
        assert_eq!(
            plan_sweep(&[], &[], 100, 1),
            Err(SweepError::EmptyDestinationSet)
        );
    }

    #[test]
    fn test_ratio_count_mismatch() {
        let result = plan_sweep(&addrs(&["A", "B"]), &[1.0], 100, 1);
        assert_eq!(
            result,
            Err(SweepError::RatioCountMismatch {
                destinations: 2,
                ratios: 1
            })
        );
    }

    #[test]
    fn test_ratios_must_sum_to_one() {
        let result = plan_sweep(&addrs(&["A", "B"]), &[0.25, 0.25], 100, 1);
        assert!(matches!(
            result,
            Err(SweepError::RatiosDoNotSumToOne { sum }) if (sum - 0.5).abs() < 1e-12
        ));

        let nan = plan_sweep(&addrs(&["A", "B"]), &[f64::NAN, 0.5], 100, 1);
        assert!(matches!(nan, Err(SweepError::RatiosDoNotSumToOne { .. })));
    }

    #[test]
    fn test_ratio_sum_within_tolerance() {
        let plan = plan_sweep(&addrs(&["A", "B"]), &[0.5, 0.5000005], 1_000, 0).unwrap();
        assert_eq!(plan.total(), 1_000);
    }

    #[test]
    fn test_validation_order() {
        // Count mismatch wins over a bad sum
        let result = plan_sweep(&addrs(&["A", "B"]), &[0.1], 100, 1);
        assert!(matches!(result, Err(SweepError::RatioCountMismatch { .. })));

        // A bad sum wins over an insufficient balance
        let result = plan_sweep(&addrs(&["A"]), &[0.4], 1, 100);
        assert!(matches!(result, Err(SweepError::RatiosDoNotSumToOne { .. })));
    }

    #[test]
    fn test_tiny_ratio_rejected() {
        let result = plan_sweep(
            &addrs(&["A", "B", "C"]),
            &[0.999999, 0.0000005, 0.0000005],
            1_100,
            100,
        );
        assert_eq!(
            result,
            Err(SweepError::ZeroAmountDestination {
                index: 1,
                address: "B".to_string()
            })
        );
    }

    #[test]
    fn test_insufficient_balance() {
        let result = plan_sweep(&addrs(&["A"]), &[1.0], 999, 1_000);
        assert_eq!(
            result,
            Err(SweepError::InsufficientBalance {
                unlocked: 999,
                fee: 1_000
            })
        );
    }

    #[test]
    fn test_nothing_left_after_fee() {
        let result = plan_sweep(&addrs(&["A"]), &[1.0], 1_000, 1_000);
        assert!(matches!(
            result,
            Err(SweepError::ZeroAmountDestination { index: 0, .. })
        ));
    }

    #[test]
    fn test_zero_residue_for_last_destination() {
        let result = plan_sweep(&addrs(&["A", "B"]), &[1.0, 0.0], 500, 0);
        assert!(matches!(
            result,
            Err(SweepError::ZeroAmountDestination { index: 1, .. })
        ));
    }

    #[test]
    fn test_negative_ratio_rejected() {
        let result = plan_sweep(&addrs(&["A", "B"]), &[-0.5, 1.5], 500, 0);
        assert!(matches!(
            result,
            Err(SweepError::ZeroAmountDestination { index: 0, .. })
        ));
    }

    #[test]
    fn test_overshoot_is_integrity_failure() {
        let result = plan_sweep(&addrs(&["A", "B"]), &[1.5, -0.5], 500, 0);
        assert!(matches!(
            result,
            Err(SweepError::PartitionIntegrityFailure { sweepable: 500, .. })
        ));
    }

    #[test]
    fn test_last_destination_absorbs_residue() {
        // 100 / 3 floors to 33 for the first two, the last gets 34
        let third = 1.0 / 3.0;
        let plan = plan_sweep(&addrs(&["A", "B", "C"]), &[third, third, third], 101, 1).unwrap();
        let amounts: Vec<u64> = plan.outputs().iter().map(|o| o.amount).collect();
        assert_eq!(amounts, vec![33, 33, 34]);

        // Reordering moves the residue to whoever is last
        let plan = plan_sweep(&addrs(&["C", "A", "B"]), &[third, third, third], 101, 1).unwrap();
        assert_eq!(plan.outputs()[2].address, "B");
        assert_eq!(plan.outputs()[2].amount, 34);
    }

    #[test]
    fn test_exact_sum_over_many_balances() {
        let destinations = addrs(&["A", "B", "C", "D", "E", "F", "G"]);
        let ratios = [0.31, 0.17, 0.13, 0.11, 0.07, 0.19, 0.02];

        for unlocked in [10_000u64, 123_457, 9_999_999_999, 18_446_744_073_709] {
            let plan = plan_sweep(&destinations, &ratios, unlocked, 4_321).unwrap();
            assert_eq!(plan.len(), destinations.len());
            assert_eq!(plan.total(), unlocked - 4_321);
            assert!(plan.outputs().iter().all(|o| o.amount > 0));
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let destinations = addrs(&["A", "B", "C"]);
        let first = plan_sweep(&destinations, &[0.6, 0.3, 0.1], 77_777, 77).unwrap();
        let second = plan_sweep(&destinations, &[0.6, 0.3, 0.1], 77_777, 77).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_destination_takes_everything() {
        let plan = plan_sweep(&addrs(&["A"]), &[1.0], 5_000, 250).unwrap();
        assert_eq!(plan.outputs(), &[Output::new("A", 4_750)]);
    }
}
