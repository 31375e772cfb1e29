//! Static instance pricing for idle-compute cost estimates
//!
//! A real deployment would query the provider pricing APIs; this table
//! covers the common classes and falls back to a flat estimate.

const HOURS_PER_MONTH: f64 = 24.0 * 30.0;

/// Monthly estimate for instance classes not in the table
const FALLBACK_MONTHLY_COST: f64 = 50.0;

/// Hourly on-demand rates by instance class
const HOURLY_RATES: &[(&str, f64)] = &[
    ("t2.micro", 0.0116),
    ("t2.small", 0.023),
    ("t2.medium", 0.0464),
    ("m5.large", 0.096),
    ("m5.xlarge", 0.192),
];

/// Estimated monthly cost for an instance class
pub fn monthly_cost(instance_class: Option<&str>) -> f64 {
    instance_class
        .and_then(|class| HOURLY_RATES.iter().find(|(name, _)| *name == class))
        .map(|(_, hourly)| hourly * HOURS_PER_MONTH)
        .unwrap_or(FALLBACK_MONTHLY_COST)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_class() {
        assert!((monthly_cost(Some("t2.micro")) - 8.352).abs() < 0.001);
        assert!((monthly_cost(Some("m5.xlarge")) - 138.24).abs() < 0.001);
    }

    #[test]
    fn test_unknown_class_uses_fallback() {
        assert_eq!(monthly_cost(Some("x1e.32xlarge")), FALLBACK_MONTHLY_COST);
        assert_eq!(monthly_cost(None), FALLBACK_MONTHLY_COST);
    }
}
