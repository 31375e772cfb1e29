//! Finding persistence
//!
//! The orchestrator appends one row per finding; every insert is its
//! own transaction, so concurrent cycles write without finding-level
//! locking. Resolution is the only status transition and only happens
//! through operator action.

mod sqlite;

pub use sqlite::{open_pool, Pool, SqliteFindingStore};

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::PersistenceError;
use crate::models::{CloudProvider, Finding, FindingStatus, Severity};

/// Query filter for listing findings
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub provider: Option<CloudProvider>,
    pub severity: Option<Severity>,
    pub status: Option<FindingStatus>,
    pub limit: Option<u32>,
}

/// Aggregated finding counts for a reporting window
#[derive(Debug, Clone, Default, Serialize)]
pub struct FindingStats {
    pub total: i64,
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub by_provider: HashMap<String, i64>,
    pub by_kind: HashMap<String, i64>,
    /// Sum of cost impact over still-open findings (monthly-normalized)
    pub open_cost_impact: f64,
}

/// Durable sink for findings
#[async_trait]
pub trait FindingStore: Send + Sync {
    /// Append one finding and return its assigned id
    async fn create_finding(&self, finding: &Finding) -> Result<i64, PersistenceError>;

    /// Findings matching the filter, newest first
    async fn list_findings(&self, filter: &FindingFilter)
        -> Result<Vec<Finding>, PersistenceError>;

    /// Aggregate counts for findings detected since the given instant
    async fn stats(&self, since: DateTime<Utc>) -> Result<FindingStats, PersistenceError>;

    /// Mark an open finding resolved; returns false if no open finding
    /// had that id
    async fn resolve_finding(&self, id: i64) -> Result<bool, PersistenceError>;
}
