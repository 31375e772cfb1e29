//! SQLite-backed finding store -- schema, pool, queries.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use super::{FindingFilter, FindingStats, FindingStore};
use crate::error::PersistenceError;
use crate::models::Finding;

/// Connection pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the findings database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool> {
    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    migrate(&conn)?;

    Ok(pool)
}

/// Idempotent schema migration.
fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS findings (
            id INTEGER PRIMARY KEY,
            provider TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            anomaly_kind TEXT NOT NULL,
            severity TEXT NOT NULL,
            cost_impact REAL NOT NULL DEFAULT 0,
            details TEXT NOT NULL,
            detected_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open'
        );

        CREATE INDEX IF NOT EXISTS idx_findings_detected_at
            ON findings (detected_at);
        CREATE INDEX IF NOT EXISTS idx_findings_status
            ON findings (status);",
    )?;
    Ok(())
}

/// Finding store backed by pooled SQLite connections
pub struct SqliteFindingStore {
    pool: Pool,
}

impl SqliteFindingStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

fn row_to_finding(row: &Row<'_>) -> rusqlite::Result<Finding> {
    fn text_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let raw: String = row.get(idx)?;
        raw.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    let details_raw: String = row.get(7)?;
    let details = serde_json::from_str(&details_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;

    let detected_raw: String = row.get(8)?;
    let detected_at = DateTime::parse_from_rfc3339(&detected_raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(Finding {
        id: Some(row.get(0)?),
        provider: text_column(row, 1)?,
        resource_id: row.get(2)?,
        resource_type: row.get(3)?,
        anomaly_kind: text_column(row, 4)?,
        severity: text_column(row, 5)?,
        cost_impact: row.get(6)?,
        details,
        detected_at,
        status: text_column(row, 9)?,
    })
}

const FINDING_COLUMNS: &str = "id, provider, resource_id, resource_type, anomaly_kind, \
                               severity, cost_impact, details, detected_at, status";

#[async_trait]
impl FindingStore for SqliteFindingStore {
    async fn create_finding(&self, finding: &Finding) -> Result<i64, PersistenceError> {
        let details = serde_json::to_string(&finding.details)?;
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO findings (provider, resource_id, resource_type, anomaly_kind,
                                   severity, cost_impact, details, detected_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                finding.provider.to_string(),
                finding.resource_id,
                finding.resource_type,
                finding.anomaly_kind.to_string(),
                finding.severity.to_string(),
                finding.cost_impact,
                details,
                finding.detected_at.to_rfc3339(),
                finding.status.to_string(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    async fn list_findings(
        &self,
        filter: &FindingFilter,
    ) -> Result<Vec<Finding>, PersistenceError> {
        let mut query = format!("SELECT {FINDING_COLUMNS} FROM findings WHERE 1=1");
        let mut values: Vec<String> = Vec::new();

        if let Some(provider) = filter.provider {
            values.push(provider.to_string());
            query.push_str(&format!(" AND provider = ?{}", values.len()));
        }
        if let Some(severity) = filter.severity {
            values.push(severity.to_string());
            query.push_str(&format!(" AND severity = ?{}", values.len()));
        }
        if let Some(status) = filter.status {
            values.push(status.to_string());
            query.push_str(&format!(" AND status = ?{}", values.len()));
        }

        query.push_str(" ORDER BY detected_at DESC, id DESC");
        query.push_str(&format!(" LIMIT {}", filter.limit.unwrap_or(100)));

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), row_to_finding)?;

        let mut findings = Vec::new();
        for row in rows {
            findings.push(row?);
        }
        Ok(findings)
    }

    async fn stats(&self, since: DateTime<Utc>) -> Result<FindingStats, PersistenceError> {
        let since = since.to_rfc3339();
        let conn = self.pool.get()?;
        let mut stats = FindingStats::default();

        conn.query_row(
            "SELECT COUNT(*),
                    COUNT(CASE WHEN severity = 'critical' THEN 1 END),
                    COUNT(CASE WHEN severity = 'high' THEN 1 END),
                    COUNT(CASE WHEN severity = 'medium' THEN 1 END)
             FROM findings WHERE detected_at >= ?1",
            params![since],
            |row| {
                stats.total = row.get(0)?;
                stats.critical = row.get(1)?;
                stats.high = row.get(2)?;
                stats.medium = row.get(3)?;
                Ok(())
            },
        )?;

        let mut stmt = conn.prepare(
            "SELECT provider, COUNT(*) FROM findings
             WHERE detected_at >= ?1 GROUP BY provider",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (provider, count) = row?;
            stats.by_provider.insert(provider, count);
        }

        let mut stmt = conn.prepare(
            "SELECT anomaly_kind, COUNT(*) FROM findings
             WHERE detected_at >= ?1 GROUP BY anomaly_kind",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (kind, count) = row?;
            stats.by_kind.insert(kind, count);
        }

        stats.open_cost_impact = conn.query_row(
            "SELECT COALESCE(SUM(cost_impact), 0) FROM findings
             WHERE detected_at >= ?1 AND status = 'open'",
            params![since],
            |row| row.get(0),
        )?;

        Ok(stats)
    }

    async fn resolve_finding(&self, id: i64) -> Result<bool, PersistenceError> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE findings SET status = 'resolved' WHERE id = ?1 AND status = 'open'",
            params![id],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyKind, CloudProvider, FindingStatus, Severity};
    use serde_json::json;

    fn test_store() -> (tempfile::TempDir, SqliteFindingStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("findings.db");
        let pool = open_pool(path.to_str().unwrap()).unwrap();
        (dir, SqliteFindingStore::new(pool))
    }

    fn idle_finding(provider: CloudProvider, resource_id: &str) -> Finding {
        Finding::new(
            provider,
            resource_id,
            "ec2",
            AnomalyKind::IdleResource,
            Severity::High,
            8.35,
            json!({ "average_cpu": 1.2, "recommendation": "Consider stopping or downsizing this instance" }),
        )
    }

    #[tokio::test]
    async fn test_create_and_list_round_trip() {
        let (_dir, store) = test_store();

        let finding = idle_finding(CloudProvider::Aws, "i-1");
        let id = store.create_finding(&finding).await.unwrap();
        assert!(id > 0);

        let listed = store
            .list_findings(&FindingFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        let stored = &listed[0];
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.provider, CloudProvider::Aws);
        assert_eq!(stored.anomaly_kind, AnomalyKind::IdleResource);
        assert_eq!(stored.severity, Severity::High);
        assert_eq!(stored.status, FindingStatus::Open);
        assert_eq!(stored.details["average_cpu"], 1.2);
    }

    #[tokio::test]
    async fn test_list_filters_by_provider_and_severity() {
        let (_dir, store) = test_store();

        store
            .create_finding(&idle_finding(CloudProvider::Aws, "i-1"))
            .await
            .unwrap();
        store
            .create_finding(&idle_finding(CloudProvider::Gcp, "vm-2"))
            .await
            .unwrap();

        let aws_only = store
            .list_findings(&FindingFilter {
                provider: Some(CloudProvider::Aws),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(aws_only.len(), 1);
        assert_eq!(aws_only[0].resource_id, "i-1");

        let critical = store
            .list_findings(&FindingFilter {
                severity: Some(Severity::Critical),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(critical.is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts_and_open_cost() {
        let (_dir, store) = test_store();

        store
            .create_finding(&idle_finding(CloudProvider::Aws, "i-1"))
            .await
            .unwrap();
        let mut spike = idle_finding(CloudProvider::Aws, "daily_spend");
        spike.anomaly_kind = AnomalyKind::CostSpike;
        spike.severity = Severity::Critical;
        spike.cost_impact = 900.0;
        store.create_finding(&spike).await.unwrap();

        let since = Utc::now() - chrono::Duration::hours(24);
        let stats = store.stats(since).await.unwrap();

        assert_eq!(stats.total, 2);
        assert_eq!(stats.critical, 1);
        assert_eq!(stats.high, 1);
        assert_eq!(stats.medium, 0);
        assert_eq!(stats.by_provider["aws"], 2);
        assert_eq!(stats.by_kind["cost_spike"], 1);
        assert!((stats.open_cost_impact - 908.35).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_resolve_is_single_shot() {
        let (_dir, store) = test_store();

        let id = store
            .create_finding(&idle_finding(CloudProvider::Azure, "vm-9"))
            .await
            .unwrap();

        assert!(store.resolve_finding(id).await.unwrap());
        // Already resolved, nothing left to transition
        assert!(!store.resolve_finding(id).await.unwrap());
        assert!(!store.resolve_finding(id + 100).await.unwrap());

        let open = store
            .list_findings(&FindingFilter {
                status: Some(FindingStatus::Open),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(open.is_empty());
    }
}
