//! Cloud Cost Sentinel daemon
//!
//! Sweeps per-provider metrics gateways for cost anomalies on a fixed
//! interval, persists findings to SQLite and routes alerts by severity.

use anyhow::Result;
use sentinel_lib::{
    adapter::{GatewayMetricSource, MetricSource},
    dispatch::{AlertDispatcher, Notifier, TicketTracker},
    health::{components, HealthRegistry},
    notify::{SlackNotifier, WebhookTicketTracker},
    orchestrator::DetectionOrchestrator,
    scheduler::{DetectionScheduler, SchedulerConfig},
    store::{open_pool, SqliteFindingStore},
    SentinelMetrics,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const SENTINEL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = SENTINEL_VERSION, "Starting cloud-cost-sentinel");

    // Load configuration
    let config = config::SentinelConfig::load()?;
    info!(
        db_path = %config.db_path,
        interval_secs = config.detection_interval_secs,
        "Sentinel configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SCHEDULER).await;
    health_registry.register(components::FINDING_STORE).await;
    health_registry.register(components::NOTIFIER).await;

    // Initialize metrics
    let metrics = SentinelMetrics::new();

    // Open the findings database
    let pool = open_pool(&config.db_path)?;
    let store = Arc::new(SqliteFindingStore::new(pool));

    // Alert channels are optional; a missing URL disables that channel
    let notifier: Option<Arc<dyn Notifier>> = match config.slack_webhook_url.as_deref() {
        Some(url) => Some(Arc::new(SlackNotifier::new(url, config.dashboard_url.clone())?)),
        None => {
            warn!("SENTINEL_SLACK_WEBHOOK_URL not set, Slack alerting disabled");
            None
        }
    };
    let tickets: Option<Arc<dyn TicketTracker>> = match config.ticket_webhook_url.as_deref() {
        Some(url) => Some(Arc::new(WebhookTicketTracker::new(url)?)),
        None => {
            warn!("SENTINEL_TICKET_WEBHOOK_URL not set, ticket creation disabled");
            None
        }
    };

    let dispatcher = Arc::new(AlertDispatcher::new(notifier, tickets));
    let orchestrator = Arc::new(DetectionOrchestrator::new(store.clone(), dispatcher));

    // One metric source per configured gateway
    let mut sources: Vec<Arc<dyn MetricSource>> = Vec::new();
    for (provider, url) in config.gateways() {
        info!(provider = %provider, url = %url, "Registering metrics gateway");
        sources.push(Arc::new(GatewayMetricSource::new(provider, url)?));
    }
    if sources.is_empty() {
        warn!("No metrics gateways configured, detection cycles will be empty");
    }

    let scheduler = Arc::new(DetectionScheduler::new(
        orchestrator,
        sources,
        SchedulerConfig {
            interval: Duration::from_secs(config.detection_interval_secs),
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
            critical_cost_threshold: config.critical_cost_threshold,
        },
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler_handle = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx));

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        store,
        scheduler,
    ));

    // Mark the daemon as ready after initialization
    health_registry.set_ready(true).await;

    // Start the API server
    tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("SIGINT received, shutting down");

    let _ = shutdown_tx.send(());
    let _ = scheduler_handle.await;

    Ok(())
}
