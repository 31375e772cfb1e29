//! Observability infrastructure for the sentinel
//!
//! Prometheus metrics for detection cycles, findings, and collaborator
//! failures, exposed through the daemon's /metrics endpoint.

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;

use crate::models::{CloudProvider, Severity};

/// Histogram buckets for cycle durations (in seconds)
const CYCLE_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SentinelMetricsInner> = OnceLock::new();

struct SentinelMetricsInner {
    detection_cycles: IntCounterVec,
    findings_detected: IntCounterVec,
    provider_timeouts: IntCounterVec,
    adapter_errors: IntCounter,
    persistence_errors: IntCounter,
    notification_errors: IntCounter,
    cycle_duration_seconds: Histogram,
}

impl SentinelMetricsInner {
    fn new() -> Self {
        Self {
            detection_cycles: register_int_counter_vec!(
                "sentinel_detection_cycles_total",
                "Completed detection cycles per provider",
                &["provider"]
            )
            .expect("Failed to register detection_cycles_total"),

            findings_detected: register_int_counter_vec!(
                "sentinel_findings_detected_total",
                "Findings persisted per provider and severity",
                &["provider", "severity"]
            )
            .expect("Failed to register findings_detected_total"),

            provider_timeouts: register_int_counter_vec!(
                "sentinel_provider_timeouts_total",
                "Detection cycles abandoned because a provider exceeded its budget",
                &["provider"]
            )
            .expect("Failed to register provider_timeouts_total"),

            adapter_errors: register_int_counter!(
                "sentinel_adapter_errors_total",
                "Metric source fetch failures (resource or phase skipped)"
            )
            .expect("Failed to register adapter_errors_total"),

            persistence_errors: register_int_counter!(
                "sentinel_persistence_errors_total",
                "Findings lost because the store rejected the write"
            )
            .expect("Failed to register persistence_errors_total"),

            notification_errors: register_int_counter!(
                "sentinel_notification_errors_total",
                "Failed notification or ticket deliveries"
            )
            .expect("Failed to register notification_errors_total"),

            cycle_duration_seconds: register_histogram!(
                "sentinel_cycle_duration_seconds",
                "Wall time of one provider detection cycle",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_duration_seconds"),
        }
    }
}

/// Lightweight handle to the global metrics instance
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct SentinelMetrics {
    _private: (),
}

impl Default for SentinelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SentinelMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SentinelMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SentinelMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_cycles(&self, provider: CloudProvider) {
        self.inner()
            .detection_cycles
            .with_label_values(&[&provider.to_string()])
            .inc();
    }

    pub fn inc_findings(&self, provider: CloudProvider, severity: Severity) {
        self.inner()
            .findings_detected
            .with_label_values(&[&provider.to_string(), &severity.to_string()])
            .inc();
    }

    pub fn inc_provider_timeouts(&self, provider: CloudProvider) {
        self.inner()
            .provider_timeouts
            .with_label_values(&[&provider.to_string()])
            .inc();
    }

    pub fn inc_adapter_errors(&self) {
        self.inner().adapter_errors.inc();
    }

    pub fn inc_persistence_errors(&self) {
        self.inner().persistence_errors.inc();
    }

    pub fn inc_notification_errors(&self) {
        self.inner().notification_errors.inc();
    }

    pub fn observe_cycle_duration(&self, duration_secs: f64) {
        self.inner().cycle_duration_seconds.observe(duration_secs);
    }
}
