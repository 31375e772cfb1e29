//! Core data models for cloud cost anomaly detection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error returned when decoding a stored enum value fails
#[derive(Debug, thiserror::Error)]
#[error("unrecognized {field} value: {value}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

/// Supported cloud providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "aws"),
            CloudProvider::Azure => write!(f, "azure"),
            CloudProvider::Gcp => write!(f, "gcp"),
        }
    }
}

impl std::str::FromStr for CloudProvider {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(CloudProvider::Aws),
            "azure" => Ok(CloudProvider::Azure),
            "gcp" => Ok(CloudProvider::Gcp),
            other => Err(ParseEnumError {
                field: "provider",
                value: other.to_string(),
            }),
        }
    }
}

/// Kinds of resources the rules inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ComputeInstance,
    ManagedDatabase,
    StorageVolume,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::ComputeInstance => write!(f, "compute_instance"),
            ResourceKind::ManagedDatabase => write!(f, "managed_database"),
            ResourceKind::StorageVolume => write!(f, "storage_volume"),
        }
    }
}

/// Anomaly classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    IdleResource,
    OrphanedResource,
    CostSpike,
}

impl AnomalyKind {
    /// Human-readable label, used in notifications
    pub fn label(&self) -> &'static str {
        match self {
            AnomalyKind::IdleResource => "Idle Resource",
            AnomalyKind::OrphanedResource => "Orphaned Resource",
            AnomalyKind::CostSpike => "Cost Spike",
        }
    }
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::IdleResource => write!(f, "idle_resource"),
            AnomalyKind::OrphanedResource => write!(f, "orphaned_resource"),
            AnomalyKind::CostSpike => write!(f, "cost_spike"),
        }
    }
}

impl std::str::FromStr for AnomalyKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle_resource" => Ok(AnomalyKind::IdleResource),
            "orphaned_resource" => Ok(AnomalyKind::OrphanedResource),
            "cost_spike" => Ok(AnomalyKind::CostSpike),
            other => Err(ParseEnumError {
                field: "anomaly_kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Finding severity, ordered medium < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(ParseEnumError {
                field: "severity",
                value: other.to_string(),
            }),
        }
    }
}

/// Finding lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Open,
    Resolved,
}

impl std::fmt::Display for FindingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingStatus::Open => write!(f, "open"),
            FindingStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for FindingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(FindingStatus::Open),
            "resolved" => Ok(FindingStatus::Resolved),
            other => Err(ParseEnumError {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Identity of a resource within its provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    pub kind: ResourceKind,
    /// Provider-native type name, e.g. "ec2", "rds", "ebs"
    pub resource_type: String,
    pub instance_class: Option<String>,
}

/// One sample of a utilization time series
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Attachment state of a detachable storage volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageState {
    pub attached: bool,
    pub size_gb: f64,
    pub created_at: DateTime<Utc>,
}

/// A single detected cost anomaly
///
/// Immutable once created except for `status` (operator resolution) and
/// `id`, which the finding store assigns on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: Option<i64>,
    pub provider: CloudProvider,
    pub resource_id: String,
    pub resource_type: String,
    pub anomaly_kind: AnomalyKind,
    pub severity: Severity,
    /// Monthly-normalized monetary estimate, never negative
    pub cost_impact: f64,
    /// Numeric evidence plus a free-text recommendation
    pub details: serde_json::Value,
    pub detected_at: DateTime<Utc>,
    pub status: FindingStatus,
}

impl Finding {
    pub fn new(
        provider: CloudProvider,
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        anomaly_kind: AnomalyKind,
        severity: Severity,
        cost_impact: f64,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: None,
            provider,
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            anomaly_kind,
            severity,
            cost_impact: cost_impact.max(0.0),
            details,
            detected_at: Utc::now(),
            status: FindingStatus::Open,
        }
    }

    /// Recommendation text from the details payload, if the rule set one
    pub fn recommendation(&self) -> Option<&str> {
        self.details.get("recommendation").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_provider_round_trip() {
        for p in [CloudProvider::Aws, CloudProvider::Azure, CloudProvider::Gcp] {
            assert_eq!(p.to_string().parse::<CloudProvider>().unwrap(), p);
        }
        assert!("digitalocean".parse::<CloudProvider>().is_err());
    }

    #[test]
    fn test_finding_cost_impact_never_negative() {
        let finding = Finding::new(
            CloudProvider::Aws,
            "i-123",
            "ec2",
            AnomalyKind::IdleResource,
            Severity::High,
            -1.0,
            serde_json::json!({}),
        );
        assert_eq!(finding.cost_impact, 0.0);
        assert_eq!(finding.status, FindingStatus::Open);
        assert!(finding.id.is_none());
    }
}
