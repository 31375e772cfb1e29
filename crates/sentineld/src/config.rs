//! Daemon configuration

use anyhow::Result;
use sentinel_lib::models::CloudProvider;
use serde::Deserialize;

/// Daemon configuration, read from SENTINEL_* environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct SentinelConfig {
    /// API server port for findings, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Path to the SQLite findings database
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Detection sweep interval in seconds
    #[serde(default = "default_detection_interval")]
    pub detection_interval_secs: u64,

    /// Per-provider cycle budget in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Dollar amount above which a cost spike is critical
    #[serde(default = "default_critical_cost_threshold")]
    pub critical_cost_threshold: f64,

    /// Slack incoming-webhook URL; alerting is skipped when unset
    #[serde(default)]
    pub slack_webhook_url: Option<String>,

    /// Ticket-tracker webhook URL; ticket creation is skipped when unset
    #[serde(default)]
    pub ticket_webhook_url: Option<String>,

    /// Dashboard base URL linked from Slack alerts
    #[serde(default = "default_dashboard_url")]
    pub dashboard_url: String,

    /// Per-provider metrics gateway base URLs
    #[serde(default)]
    pub aws_gateway_url: Option<String>,
    #[serde(default)]
    pub azure_gateway_url: Option<String>,
    #[serde(default)]
    pub gcp_gateway_url: Option<String>,
}

fn default_api_port() -> u16 {
    8080
}

fn default_db_path() -> String {
    "sentinel.db".to_string()
}

fn default_detection_interval() -> u64 {
    300
}

fn default_provider_timeout() -> u64 {
    120
}

fn default_critical_cost_threshold() -> f64 {
    1000.0
}

fn default_dashboard_url() -> String {
    "http://localhost:8501".to_string()
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            db_path: default_db_path(),
            detection_interval_secs: default_detection_interval(),
            provider_timeout_secs: default_provider_timeout(),
            critical_cost_threshold: default_critical_cost_threshold(),
            slack_webhook_url: None,
            ticket_webhook_url: None,
            dashboard_url: default_dashboard_url(),
            aws_gateway_url: None,
            azure_gateway_url: None,
            gcp_gateway_url: None,
        }
    }
}

impl SentinelConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SENTINEL"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    /// Configured metrics gateways, one per cloud provider
    pub fn gateways(&self) -> Vec<(CloudProvider, &str)> {
        let mut gateways = Vec::new();
        if let Some(url) = self.aws_gateway_url.as_deref() {
            gateways.push((CloudProvider::Aws, url));
        }
        if let Some(url) = self.azure_gateway_url.as_deref() {
            gateways.push((CloudProvider::Azure, url));
        }
        if let Some(url) = self.gcp_gateway_url.as_deref() {
            gateways.push((CloudProvider::Gcp, url));
        }
        gateways
    }
}
