//! Tracking-ticket webhook
//!
//! Critical findings open a ticket in whatever tracker sits behind the
//! configured webhook. The payload is deliberately generic JSON rather
//! than any one tracker's API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::dispatch::TicketTracker;
use crate::error::NotificationError;
use crate::models::Finding;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct TicketPayload<'a> {
    summary: String,
    description: String,
    severity: String,
    provider: String,
    resource_id: &'a str,
    anomaly_kind: String,
    cost_impact: f64,
    finding_id: Option<i64>,
}

impl<'a> TicketPayload<'a> {
    fn for_finding(finding: &'a Finding) -> Self {
        Self {
            summary: format!(
                "Cloud cost anomaly: {} on {} ({})",
                finding.anomaly_kind.label(),
                finding.resource_id,
                finding.provider
            ),
            description: format!(
                "Potential impact ${:.2}/month. {}",
                finding.cost_impact,
                finding
                    .recommendation()
                    .unwrap_or("Please investigate this resource.")
            ),
            severity: finding.severity.to_string(),
            provider: finding.provider.to_string(),
            resource_id: &finding.resource_id,
            anomaly_kind: finding.anomaly_kind.to_string(),
            cost_impact: finding.cost_impact,
            finding_id: finding.id,
        }
    }
}

/// Ticket sink posting to a tracker webhook
pub struct WebhookTicketTracker {
    client: Client,
    endpoint: Url,
}

impl WebhookTicketTracker {
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let endpoint = Url::parse(endpoint).context("Invalid ticket webhook URL")?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl TicketTracker for WebhookTicketTracker {
    async fn create_tracking_ticket(&self, finding: &Finding) -> Result<(), NotificationError> {
        let payload = TicketPayload::for_finding(finding);
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
