//! Core sweep components
//!
//! This module contains the engine-independent pieces:
//! - Fee model and priorities
//! - Sweep fee estimation through a probe transaction
//! - Proportional partitioning of a balance across destinations

pub mod fee;
pub mod sweep;

pub use fee::{
    FeeEstimator, FeeModel, Priority, BASE_TX_SIZE, DEFAULT_FEE_PER_BYTE, OUTPUT_SIZE,
    PROBE_AMOUNT,
};
pub use sweep::{plan_sweep, SweepError, SweepPlan, SweepRequest, RATIO_TOLERANCE};
