//! Daily cost spike detection
//!
//! Compares the latest day's cost against the mean of the seven days
//! preceding it. Severity is monotone in magnitude: a latest-day cost
//! above the critical threshold always classifies at least as high as
//! a smaller one.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::json;

use super::round2;
use crate::models::{AnomalyKind, CloudProvider, Finding, Severity};

/// Latest-day cost must exceed this multiple of the trailing mean (strict)
const SPIKE_MULTIPLIER: f64 = 1.5;

/// Days of trailing history the mean is computed over
const TRAILING_DAYS: usize = 7;

/// Minimum series length: the latest day plus a full trailing window
const MIN_HISTORY_DAYS: usize = TRAILING_DAYS + 1;

/// Detects spikes in the account-wide daily spend series
#[derive(Debug, Clone)]
pub struct CostSpikeRule {
    /// Latest-day cost above this (strict) classifies as critical
    pub critical_cost_threshold: f64,
}

impl CostSpikeRule {
    pub fn new(critical_cost_threshold: f64) -> Self {
        Self {
            critical_cost_threshold,
        }
    }

    /// Evaluate a date-ordered daily cost series
    ///
    /// Abstains with fewer than eight days of history and when the
    /// trailing mean is zero or negative (the division guard lives
    /// here, not in the caller).
    pub fn evaluate(
        &self,
        provider: CloudProvider,
        series: &BTreeMap<NaiveDate, f64>,
    ) -> Option<Finding> {
        if series.len() < MIN_HISTORY_DAYS {
            return None;
        }

        let (latest_date, latest_cost) = series.iter().next_back().map(|(d, c)| (*d, *c))?;
        let trailing: Vec<f64> = series.values().rev().skip(1).take(TRAILING_DAYS).copied().collect();
        let mean = trailing.iter().sum::<f64>() / trailing.len() as f64;

        if mean <= 0.0 {
            return None;
        }
        if latest_cost <= mean * SPIKE_MULTIPLIER {
            return None;
        }

        let severity = if latest_cost > self.critical_cost_threshold {
            Severity::Critical
        } else {
            Severity::High
        };

        let details = json!({
            "average_daily_cost": round2(mean),
            "current_daily_cost": round2(latest_cost),
            "increase_percentage": round2((latest_cost - mean) / mean * 100.0),
            "date": latest_date.to_string(),
            "recommendation": "Review recent deployments and service usage for this account",
        });

        Some(Finding::new(
            provider,
            "daily_spend",
            "account",
            AnomalyKind::CostSpike,
            severity,
            latest_cost - mean,
            details,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Seven trailing days at `base` followed by one day at `latest`
    fn spike_series(base: f64, latest: f64) -> BTreeMap<NaiveDate, f64> {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut series = BTreeMap::new();
        for i in 0..7 {
            series.insert(start + chrono::Duration::days(i), base);
        }
        series.insert(start + chrono::Duration::days(7), latest);
        series
    }

    #[test]
    fn test_short_history_abstains() {
        let rule = CostSpikeRule::new(1000.0);
        let mut series = spike_series(100.0, 500.0);
        series.pop_first();
        assert_eq!(series.len(), 7);
        assert!(rule.evaluate(CloudProvider::Aws, &series).is_none());
    }

    #[test]
    fn test_spike_boundary_is_strict() {
        let rule = CostSpikeRule::new(1000.0);

        // Trailing mean 100: 151 > 150 triggers, exactly 150 does not.
        let finding = rule
            .evaluate(CloudProvider::Aws, &spike_series(100.0, 151.0))
            .unwrap();
        assert_eq!(finding.anomaly_kind, AnomalyKind::CostSpike);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.resource_id, "daily_spend");
        assert_eq!(finding.details["increase_percentage"], 51.0);
        assert!((finding.cost_impact - 51.0).abs() < 1e-9);

        assert!(rule
            .evaluate(CloudProvider::Aws, &spike_series(100.0, 150.0))
            .is_none());
    }

    #[test]
    fn test_critical_threshold_is_strict() {
        let rule = CostSpikeRule::new(1000.0);

        let high = rule
            .evaluate(CloudProvider::Aws, &spike_series(500.0, 1000.0))
            .unwrap();
        assert_eq!(high.severity, Severity::High);

        let critical = rule
            .evaluate(CloudProvider::Aws, &spike_series(500.0, 1200.0))
            .unwrap();
        assert_eq!(critical.severity, Severity::Critical);
    }

    #[test]
    fn test_zero_mean_abstains() {
        let rule = CostSpikeRule::new(1000.0);
        assert!(rule
            .evaluate(CloudProvider::Gcp, &spike_series(0.0, 50.0))
            .is_none());
    }

    #[test]
    fn test_latest_excluded_from_trailing_mean() {
        let rule = CostSpikeRule::new(10_000.0);
        let series = spike_series(100.0, 1000.0);

        let finding = rule.evaluate(CloudProvider::Azure, &series).unwrap();
        // Mean is 100, not skewed by the 1000 spike day itself.
        assert_eq!(finding.details["average_daily_cost"], 100.0);
        assert!((finding.cost_impact - 900.0).abs() < 1e-9);
    }
}
