//! Metric source adapters
//!
//! One [`MetricSource`] per provider supplies the raw utilization and
//! billing data the rules evaluate. The detection core never talks to
//! cloud SDKs directly; the shipped implementation speaks to a
//! per-provider metrics gateway over HTTP.

mod gateway;

pub use gateway::GatewayMetricSource;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::AdapterError;
use crate::models::{CloudProvider, MetricPoint, ResourceKind, ResourceRef, StorageState};

/// Query contract for one provider's metric and billing data
#[async_trait]
pub trait MetricSource: Send + Sync {
    fn provider(&self) -> CloudProvider;

    /// Active resources of the given kind
    async fn list_active_resources(
        &self,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceRef>, AdapterError>;

    /// Utilization samples for one resource; may be empty for resources
    /// newer than the lookback window
    async fn utilization_series(
        &self,
        resource: &ResourceRef,
        lookback: Duration,
        granularity: Duration,
    ) -> Result<Vec<MetricPoint>, AdapterError>;

    /// Account-wide daily spend, keyed by date
    async fn daily_cost_series(
        &self,
        window_days: u32,
    ) -> Result<BTreeMap<NaiveDate, f64>, AdapterError>;

    /// Attachment state for one storage volume
    async fn storage_state(&self, volume: &ResourceRef) -> Result<StorageState, AdapterError>;
}
