//! Detection scheduling loop
//!
//! Owns the periodic cycle across all configured providers. Providers
//! are independent: each cycle runs in its own task under a timeout, so
//! a slow or hung provider never stalls the others, and a timed-out
//! provider never fails the overall cycle. On-demand triggers spawn the
//! same per-provider run without touching the scheduled loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

use crate::adapter::MetricSource;
use crate::models::CloudProvider;
use crate::observability::SentinelMetrics;
use crate::orchestrator::DetectionOrchestrator;
use crate::rules::RuleSet;

/// Default interval between scheduled detection cycles
pub const DEFAULT_DETECTION_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default per-provider cycle budget
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the detection scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval between scheduled cycles
    pub interval: Duration,
    /// Budget for one provider's cycle before it is abandoned
    pub provider_timeout: Duration,
    /// Daily cost above which a spike classifies as critical
    pub critical_cost_threshold: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_DETECTION_INTERVAL,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            critical_cost_threshold: 1000.0,
        }
    }
}

/// Periodic detection scheduler over all configured providers
pub struct DetectionScheduler {
    orchestrator: Arc<DetectionOrchestrator>,
    sources: Vec<Arc<dyn MetricSource>>,
    config: SchedulerConfig,
    metrics: SentinelMetrics,
}

impl DetectionScheduler {
    pub fn new(
        orchestrator: Arc<DetectionOrchestrator>,
        sources: Vec<Arc<dyn MetricSource>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            orchestrator,
            sources,
            config,
            metrics: SentinelMetrics::new(),
        }
    }

    /// Run the scheduled detection loop until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            providers = self.sources.len(),
            "Starting detection scheduler"
        );

        let mut ticker = interval(self.config.interval);
        // The interval's first tick fires immediately; consume it so the
        // first cycle runs one full period after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_all().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down detection scheduler");
                    break;
                }
            }
        }
    }

    /// Run one cycle for every configured provider and wait for all
    pub async fn run_all(&self) {
        let mut handles = Vec::new();
        for source in &self.sources {
            handles.push(self.spawn_provider_cycle(Arc::clone(source)));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Start on-demand cycles without waiting, optionally for one provider
    ///
    /// Runs independently of the scheduled loop; overlapping cycles are
    /// allowed and any duplicate findings are an operator-review
    /// concern, not the core's. Returns the providers triggered.
    pub fn trigger(&self, provider: Option<CloudProvider>) -> Vec<CloudProvider> {
        let mut triggered = Vec::new();
        for source in &self.sources {
            if provider.is_some_and(|p| p != source.provider()) {
                continue;
            }
            triggered.push(source.provider());
            self.spawn_provider_cycle(Arc::clone(source));
        }
        triggered
    }

    fn spawn_provider_cycle(&self, source: Arc<dyn MetricSource>) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let rules = RuleSet::new(self.config.critical_cost_threshold);
        let budget = self.config.provider_timeout;
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            let provider = source.provider();
            match tokio::time::timeout(budget, orchestrator.run_cycle(source.as_ref(), &rules))
                .await
            {
                Ok(_findings) => {}
                Err(_) => {
                    metrics.inc_provider_timeouts(provider);
                    warn!(
                        provider = %provider,
                        budget_secs = budget.as_secs(),
                        "Provider detection cycle timed out"
                    );
                }
            }
        })
    }
}
