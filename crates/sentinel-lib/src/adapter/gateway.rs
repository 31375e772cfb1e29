//! HTTP metric-gateway adapter
//!
//! Each provider runs behind a metrics gateway that wraps its cloud SDK
//! and exposes the query contract as plain REST. This adapter maps that
//! contract onto [`MetricSource`].

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::MetricSource;
use crate::error::AdapterError;
use crate::models::{CloudProvider, MetricPoint, ResourceKind, ResourceRef, StorageState};

/// Request timeout for gateway calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Metric source backed by a provider metrics gateway
pub struct GatewayMetricSource {
    provider: CloudProvider,
    client: Client,
    base_url: Url,
}

impl GatewayMetricSource {
    pub fn new(provider: CloudProvider, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid gateway URL")?;

        Ok(Self {
            provider,
            client,
            base_url,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AdapterError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| AdapterError::Malformed(format!("invalid gateway path: {e}")))?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AdapterError::Unavailable(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl MetricSource for GatewayMetricSource {
    fn provider(&self) -> CloudProvider {
        self.provider
    }

    async fn list_active_resources(
        &self,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceRef>, AdapterError> {
        self.get_json(&format!("/v1/resources?kind={kind}")).await
    }

    async fn utilization_series(
        &self,
        resource: &ResourceRef,
        lookback: Duration,
        granularity: Duration,
    ) -> Result<Vec<MetricPoint>, AdapterError> {
        self.get_json(&format!(
            "/v1/utilization/{}?lookback_secs={}&granularity_secs={}",
            resource.id,
            lookback.as_secs(),
            granularity.as_secs()
        ))
        .await
    }

    async fn daily_cost_series(
        &self,
        window_days: u32,
    ) -> Result<BTreeMap<NaiveDate, f64>, AdapterError> {
        self.get_json(&format!("/v1/costs/daily?days={window_days}"))
            .await
    }

    async fn storage_state(&self, volume: &ResourceRef) -> Result<StorageState, AdapterError> {
        self.get_json(&format!("/v1/storage/{}", volume.id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_resources_from_gateway() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/resources?kind=compute_instance")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"id":"i-1","kind":"compute_instance","resource_type":"ec2","instance_class":"t2.micro"}]"#,
            )
            .create_async()
            .await;

        let source = GatewayMetricSource::new(CloudProvider::Aws, &server.url()).unwrap();
        let resources = source
            .list_active_resources(ResourceKind::ComputeInstance)
            .await
            .unwrap();

        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].id, "i-1");
        assert_eq!(resources[0].instance_class.as_deref(), Some("t2.micro"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gateway_error_maps_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/costs/daily?days=30")
            .with_status(502)
            .create_async()
            .await;

        let source = GatewayMetricSource::new(CloudProvider::Gcp, &server.url()).unwrap();
        let err = source.daily_cost_series(30).await.unwrap_err();
        assert!(matches!(err, AdapterError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_bad_payload_maps_to_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/costs/daily?days=30")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let source = GatewayMetricSource::new(CloudProvider::Azure, &server.url()).unwrap();
        let err = source.daily_cost_series(30).await.unwrap_err();
        assert!(matches!(err, AdapterError::Malformed(_)));
    }
}
