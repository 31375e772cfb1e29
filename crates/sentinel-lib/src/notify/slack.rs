//! Slack webhook notifier
//!
//! Formats findings as Block Kit messages and posts them to an
//! incoming-webhook URL. Delivery is fire-and-forget: failures surface
//! as `NotificationError` and are never retried here.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::dispatch::Notifier;
use crate::error::NotificationError;
use crate::models::Finding;

/// Request timeout for webhook posts
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Block Kit message payload
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: Text,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<Text>>,
    },
    Actions {
        elements: Vec<Element>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button { text: Text, url: String, style: String },
}

/// Real-time notifier posting to a Slack incoming webhook
pub struct SlackNotifier {
    client: Client,
    webhook_url: Url,
    dashboard_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str, dashboard_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let webhook_url = Url::parse(webhook_url).context("Invalid Slack webhook URL")?;

        Ok(Self {
            client,
            webhook_url,
            dashboard_url: dashboard_url.into(),
        })
    }

    /// Build the Block Kit message for one finding
    pub fn build_message(&self, finding: &Finding) -> SlackMessage {
        let mut blocks = vec![
            Block::Header {
                text: Text::PlainText {
                    text: "Cloud Cost Anomaly Detected".to_string(),
                    emoji: true,
                },
            },
            Block::Section {
                text: None,
                fields: Some(vec![
                    Text::Mrkdwn {
                        text: format!("*Cloud:*\n{}", finding.provider.to_string().to_uppercase()),
                    },
                    Text::Mrkdwn {
                        text: format!(
                            "*Severity:*\n{}",
                            finding.severity.to_string().to_uppercase()
                        ),
                    },
                    Text::Mrkdwn {
                        text: format!("*Resource:*\n`{}`", finding.resource_id),
                    },
                    Text::Mrkdwn {
                        text: format!("*Type:*\n{}", finding.anomaly_kind.label()),
                    },
                ]),
            },
            Block::Section {
                text: Some(Text::Mrkdwn {
                    text: format!("*Potential Impact:* ${:.2}/month", finding.cost_impact),
                }),
                fields: None,
            },
            Block::Section {
                text: Some(Text::Mrkdwn {
                    text: format!(
                        "*Recommendation:*\n{}",
                        finding
                            .recommendation()
                            .unwrap_or("Please investigate this resource.")
                    ),
                }),
                fields: None,
            },
        ];

        blocks.push(Block::Actions {
            elements: vec![Element::Button {
                text: Text::PlainText {
                    text: "View in Dashboard".to_string(),
                    emoji: true,
                },
                url: self.dashboard_url.clone(),
                style: "primary".to_string(),
            }],
        });

        SlackMessage { blocks }
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn send_notification(&self, finding: &Finding) -> Result<(), NotificationError> {
        let message = self.build_message(finding);
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&message)
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
