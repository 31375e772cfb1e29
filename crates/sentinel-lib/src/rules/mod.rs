//! Threshold rules that turn metric snapshots into findings
//!
//! Each rule is a stateless value with a pure `evaluate` method: no I/O,
//! deterministic given the snapshot, and total over well-formed input.
//! Malformed snapshots make a rule abstain, never fail.

mod cost_spike;
mod idle_compute;
mod orphaned_storage;

pub use cost_spike::CostSpikeRule;
pub use idle_compute::IdleComputeRule;
pub use orphaned_storage::OrphanedStorageRule;

use std::time::Duration;

/// Historical period the utilization rules inspect
pub const UTILIZATION_LOOKBACK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Sample granularity for utilization series (one point per day)
pub const UTILIZATION_GRANULARITY: Duration = Duration::from_secs(24 * 60 * 60);

/// Window of daily costs the spike rule inspects
pub const COST_WINDOW_DAYS: u32 = 30;

/// The full rule set for one detection cycle, in registration order:
/// idle compute, idle databases, orphaned storage, cost spike.
///
/// Rules carry no state, so a fresh set is built at the start of each
/// cycle rather than held for the process lifetime.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub idle_compute: IdleComputeRule,
    pub idle_database: IdleComputeRule,
    pub orphaned_storage: OrphanedStorageRule,
    pub cost_spike: CostSpikeRule,
}

impl RuleSet {
    pub fn new(critical_cost_threshold: f64) -> Self {
        Self {
            idle_compute: IdleComputeRule::general_compute(),
            idle_database: IdleComputeRule::managed_database(),
            orphaned_storage: OrphanedStorageRule::default(),
            cost_spike: CostSpikeRule::new(critical_cost_threshold),
        }
    }
}

/// Round to two decimal places for details payloads
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
