//! Idle compute detection
//!
//! Flags instances whose average CPU utilization over the lookback
//! window sits below a per-resource-class ceiling. Cost impact comes
//! from the static price table.

use serde_json::json;

use super::round2;
use crate::models::{AnomalyKind, CloudProvider, Finding, MetricPoint, ResourceRef, Severity};
use crate::pricing;

/// Average-CPU ceiling for general-purpose compute instances (percent)
const GENERAL_COMPUTE_CEILING: f64 = 5.0;

/// Managed databases idle at a structurally lower baseline
const MANAGED_DATABASE_CEILING: f64 = 2.0;

/// Detects compute resources with average utilization below a ceiling
#[derive(Debug, Clone)]
pub struct IdleComputeRule {
    /// Average utilization below this value (strict) flags the resource
    pub ceiling_percent: f64,
}

impl IdleComputeRule {
    /// Rule variant for general-purpose compute instances
    pub fn general_compute() -> Self {
        Self {
            ceiling_percent: GENERAL_COMPUTE_CEILING,
        }
    }

    /// Rule variant for managed database instances
    pub fn managed_database() -> Self {
        Self {
            ceiling_percent: MANAGED_DATABASE_CEILING,
        }
    }

    /// Evaluate one resource's utilization series
    ///
    /// Abstains when the series is empty (resource too new for the
    /// lookback window) or when average utilization is at or above the
    /// ceiling.
    pub fn evaluate(
        &self,
        provider: CloudProvider,
        resource: &ResourceRef,
        series: &[MetricPoint],
    ) -> Option<Finding> {
        if series.is_empty() {
            return None;
        }

        let avg = series.iter().map(|p| p.value).sum::<f64>() / series.len() as f64;
        if avg >= self.ceiling_percent {
            return None;
        }

        let instance_class = resource.instance_class.as_deref();
        let details = json!({
            "average_cpu": round2(avg),
            "instance_class": instance_class,
            "recommendation": "Consider stopping or downsizing this instance",
        });

        Some(Finding::new(
            provider,
            resource.id.clone(),
            resource.resource_type.clone(),
            AnomalyKind::IdleResource,
            Severity::High,
            pricing::monthly_cost(instance_class),
            details,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceKind;
    use chrono::{Duration, Utc};

    fn instance(class: Option<&str>) -> ResourceRef {
        ResourceRef {
            id: "i-0abc".to_string(),
            kind: ResourceKind::ComputeInstance,
            resource_type: "ec2".to_string(),
            instance_class: class.map(String::from),
        }
    }

    fn series(values: &[f64]) -> Vec<MetricPoint> {
        let start = Utc::now() - Duration::days(values.len() as i64);
        values
            .iter()
            .enumerate()
            .map(|(i, v)| MetricPoint {
                timestamp: start + Duration::days(i as i64),
                value: *v,
            })
            .collect()
    }

    #[test]
    fn test_empty_series_abstains() {
        let rule = IdleComputeRule::general_compute();
        assert!(rule
            .evaluate(CloudProvider::Aws, &instance(None), &[])
            .is_none());
    }

    #[test]
    fn test_idle_instance_flagged_high() {
        let rule = IdleComputeRule::general_compute();
        let finding = rule
            .evaluate(
                CloudProvider::Aws,
                &instance(Some("t2.micro")),
                &series(&[1.0, 1.2, 0.8]),
            )
            .unwrap();

        assert_eq!(finding.anomaly_kind, AnomalyKind::IdleResource);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.resource_id, "i-0abc");
        assert_eq!(finding.details["average_cpu"], 1.0);
        assert!((finding.cost_impact - 8.352).abs() < 0.001);
    }

    #[test]
    fn test_compute_ceiling_boundary() {
        let rule = IdleComputeRule::general_compute();
        let below = series(&[4.9]);
        let at = series(&[5.0]);

        assert!(rule
            .evaluate(CloudProvider::Aws, &instance(None), &below)
            .is_some());
        assert!(rule
            .evaluate(CloudProvider::Aws, &instance(None), &at)
            .is_none());
    }

    #[test]
    fn test_database_ceiling_boundary() {
        let rule = IdleComputeRule::managed_database();
        let db = ResourceRef {
            id: "prod-db".to_string(),
            kind: ResourceKind::ManagedDatabase,
            resource_type: "rds".to_string(),
            instance_class: None,
        };

        assert!(rule
            .evaluate(CloudProvider::Aws, &db, &series(&[1.9]))
            .is_some());
        assert!(rule
            .evaluate(CloudProvider::Aws, &db, &series(&[2.0]))
            .is_none());
    }

    #[test]
    fn test_unknown_class_uses_fallback_cost() {
        let rule = IdleComputeRule::general_compute();
        let finding = rule
            .evaluate(CloudProvider::Aws, &instance(None), &series(&[0.5]))
            .unwrap();
        assert_eq!(finding.cost_impact, 50.0);
    }
}
