//! Detection orchestration
//!
//! Runs the full rule set against one provider's metric source,
//! persists each finding, and hands persisted findings to the alert
//! dispatcher. A failed fetch skips only the affected resource or
//! phase; a failed persist drops only that finding's alert. Output
//! order is deterministic: rule registration order, then the adapter's
//! resource order within a rule.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::adapter::MetricSource;
use crate::dispatch::AlertDispatcher;
use crate::models::{Finding, ResourceKind};
use crate::observability::SentinelMetrics;
use crate::rules::{
    CostSpikeRule, IdleComputeRule, OrphanedStorageRule, RuleSet, COST_WINDOW_DAYS,
    UTILIZATION_GRANULARITY, UTILIZATION_LOOKBACK,
};
use crate::store::FindingStore;

/// Runs detection cycles and routes findings to persistence and alerting
pub struct DetectionOrchestrator {
    store: Arc<dyn FindingStore>,
    dispatcher: Arc<AlertDispatcher>,
    metrics: SentinelMetrics,
}

impl DetectionOrchestrator {
    pub fn new(store: Arc<dyn FindingStore>, dispatcher: Arc<AlertDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            metrics: SentinelMetrics::new(),
        }
    }

    /// Run one complete detection cycle for one provider
    ///
    /// Returns every finding the rules produced, in evaluation order.
    /// Findings that failed to persist are returned without an id and
    /// were not alerted.
    pub async fn run_cycle(&self, source: &dyn MetricSource, rules: &RuleSet) -> Vec<Finding> {
        let provider = source.provider();
        let start = Instant::now();
        let mut findings = Vec::new();

        self.evaluate_idle(
            source,
            &rules.idle_compute,
            ResourceKind::ComputeInstance,
            &mut findings,
        )
        .await;
        self.evaluate_idle(
            source,
            &rules.idle_database,
            ResourceKind::ManagedDatabase,
            &mut findings,
        )
        .await;
        self.evaluate_storage(source, &rules.orphaned_storage, &mut findings)
            .await;
        self.evaluate_cost_spike(source, &rules.cost_spike, &mut findings)
            .await;

        for finding in &mut findings {
            match self.store.create_finding(finding).await {
                Ok(id) => {
                    finding.id = Some(id);
                    self.metrics.inc_findings(provider, finding.severity);
                    self.dispatcher.dispatch(finding).await;
                }
                Err(e) => {
                    self.metrics.inc_persistence_errors();
                    warn!(
                        provider = %provider,
                        resource_id = %finding.resource_id,
                        error = %e,
                        "Failed to persist finding, alert skipped (data loss)"
                    );
                }
            }
        }

        self.metrics.inc_cycles(provider);
        self.metrics
            .observe_cycle_duration(start.elapsed().as_secs_f64());
        info!(
            provider = %provider,
            findings = findings.len(),
            "Detection cycle complete"
        );

        findings
    }

    async fn evaluate_idle(
        &self,
        source: &dyn MetricSource,
        rule: &IdleComputeRule,
        kind: ResourceKind,
        out: &mut Vec<Finding>,
    ) {
        let provider = source.provider();
        let resources = match source.list_active_resources(kind).await {
            Ok(resources) => resources,
            Err(e) => {
                self.metrics.inc_adapter_errors();
                warn!(
                    provider = %provider,
                    kind = %kind,
                    error = %e,
                    "Failed to list resources, skipping rule for this cycle"
                );
                return;
            }
        };

        for resource in resources {
            match source
                .utilization_series(&resource, UTILIZATION_LOOKBACK, UTILIZATION_GRANULARITY)
                .await
            {
                Ok(series) => {
                    if let Some(finding) = rule.evaluate(provider, &resource, &series) {
                        out.push(finding);
                    }
                }
                Err(e) => {
                    self.metrics.inc_adapter_errors();
                    warn!(
                        provider = %provider,
                        resource_id = %resource.id,
                        error = %e,
                        "Utilization fetch failed, skipping resource"
                    );
                }
            }
        }
    }

    async fn evaluate_storage(
        &self,
        source: &dyn MetricSource,
        rule: &OrphanedStorageRule,
        out: &mut Vec<Finding>,
    ) {
        let provider = source.provider();
        let volumes = match source
            .list_active_resources(ResourceKind::StorageVolume)
            .await
        {
            Ok(volumes) => volumes,
            Err(e) => {
                self.metrics.inc_adapter_errors();
                warn!(
                    provider = %provider,
                    error = %e,
                    "Failed to list storage volumes, skipping rule for this cycle"
                );
                return;
            }
        };

        let now = Utc::now();
        for volume in volumes {
            match source.storage_state(&volume).await {
                Ok(state) => {
                    if let Some(finding) = rule.evaluate(provider, &volume, &state, now) {
                        out.push(finding);
                    }
                }
                Err(e) => {
                    self.metrics.inc_adapter_errors();
                    warn!(
                        provider = %provider,
                        resource_id = %volume.id,
                        error = %e,
                        "Storage state fetch failed, skipping volume"
                    );
                }
            }
        }
    }

    async fn evaluate_cost_spike(
        &self,
        source: &dyn MetricSource,
        rule: &CostSpikeRule,
        out: &mut Vec<Finding>,
    ) {
        let provider = source.provider();
        match source.daily_cost_series(COST_WINDOW_DAYS).await {
            Ok(series) => {
                if let Some(finding) = rule.evaluate(provider, &series) {
                    out.push(finding);
                }
            }
            Err(e) => {
                self.metrics.inc_adapter_errors();
                warn!(
                    provider = %provider,
                    error = %e,
                    "Daily cost fetch failed, skipping spike rule for this cycle"
                );
            }
        }
    }
}
