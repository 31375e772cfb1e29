//! Orphaned storage detection
//!
//! Flags detachable volumes that have been unattached longer than a
//! grace period. The grace period avoids flagging volumes that are
//! mid-provisioning.

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::models::{AnomalyKind, CloudProvider, Finding, ResourceRef, Severity, StorageState};

/// Unattached volumes younger than this are left alone (whole days)
const GRACE_PERIOD_DAYS: i64 = 7;

/// Approximate monthly storage rate per GB
const MONTHLY_RATE_PER_GB: f64 = 0.10;

/// Detects unattached volumes past the provisioning grace period
#[derive(Debug, Clone)]
pub struct OrphanedStorageRule {
    pub grace_period_days: i64,
    pub monthly_rate_per_gb: f64,
}

impl Default for OrphanedStorageRule {
    fn default() -> Self {
        Self {
            grace_period_days: GRACE_PERIOD_DAYS,
            monthly_rate_per_gb: MONTHLY_RATE_PER_GB,
        }
    }
}

impl OrphanedStorageRule {
    /// Evaluate one volume's attachment state
    ///
    /// Abstains for attached volumes, volumes within the grace period,
    /// and malformed states (negative size).
    pub fn evaluate(
        &self,
        provider: CloudProvider,
        volume: &ResourceRef,
        state: &StorageState,
        now: DateTime<Utc>,
    ) -> Option<Finding> {
        if state.attached {
            return None;
        }
        if state.size_gb < 0.0 {
            return None;
        }

        let age_days = (now - state.created_at).num_days();
        if age_days <= self.grace_period_days {
            return None;
        }

        let details = json!({
            "size_gb": state.size_gb,
            "age_days": age_days,
            "recommendation": "Delete this unused volume",
        });

        Some(Finding::new(
            provider,
            volume.id.clone(),
            volume.resource_type.clone(),
            AnomalyKind::OrphanedResource,
            Severity::Medium,
            state.size_gb * self.monthly_rate_per_gb,
            details,
        ))
    }
}
