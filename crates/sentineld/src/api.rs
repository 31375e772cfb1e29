//! HTTP API for findings, detection triggers, health and metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use prometheus::{Encoder, TextEncoder};
use sentinel_lib::{
    health::{ComponentStatus, HealthRegistry},
    models::{CloudProvider, FindingStatus, Severity},
    scheduler::DetectionScheduler,
    store::{FindingFilter, FindingStore},
    SentinelMetrics,
};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: SentinelMetrics,
    pub store: Arc<dyn FindingStore>,
    pub scheduler: Arc<DetectionScheduler>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: SentinelMetrics,
        store: Arc<dyn FindingStore>,
        scheduler: Arc<DetectionScheduler>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            store,
            scheduler,
        }
    }
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}

fn storage_error(err: sentinel_lib::error::PersistenceError) -> ApiError {
    error!(error = %err, "Finding store query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "finding store unavailable" })),
    )
}

fn parse_param<T: FromStr>(value: Option<&str>, name: &str) -> Result<Option<T>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| bad_request(format!("invalid {name}: {raw}"))),
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

#[derive(Debug, Deserialize)]
struct DetectParams {
    provider: Option<String>,
}

/// Kick off a detection sweep without waiting for the next tick
async fn trigger_detection(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DetectParams>,
) -> Result<impl IntoResponse, ApiError> {
    let provider = match params.provider.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(
            CloudProvider::from_str(raw)
                .map_err(|_| bad_request(format!("invalid provider: {raw}")))?,
        ),
    };

    let triggered = state.scheduler.trigger(provider);
    info!(providers = ?triggered, "Detection sweep triggered via API");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "detection_started",
            "providers": triggered,
        })),
    ))
}

#[derive(Debug, Deserialize)]
struct AnomalyParams {
    provider: Option<String>,
    severity: Option<String>,
    status: Option<String>,
    limit: Option<u32>,
}

/// List recorded findings, newest first
async fn list_anomalies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnomalyParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = FindingFilter {
        provider: parse_param::<CloudProvider>(params.provider.as_deref(), "provider")?,
        severity: parse_param::<Severity>(params.severity.as_deref(), "severity")?,
        status: parse_param::<FindingStatus>(params.status.as_deref(), "status")?,
        limit: params.limit,
    };

    let findings = state
        .store
        .list_findings(&filter)
        .await
        .map_err(storage_error)?;

    let critical = findings.iter().filter(|f| f.severity == Severity::Critical).count();
    let high = findings.iter().filter(|f| f.severity == Severity::High).count();
    let medium = findings.iter().filter(|f| f.severity == Severity::Medium).count();

    Ok(Json(json!({
        "count": findings.len(),
        "severity_summary": {
            "critical": critical,
            "high": high,
            "medium": medium,
        },
        "anomalies": findings,
    })))
}

#[derive(Debug, Deserialize)]
struct StatsParams {
    hours: Option<i64>,
}

/// Aggregate finding counts over a trailing window (default 24h)
async fn stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = params.hours.unwrap_or(24);
    if hours <= 0 {
        return Err(bad_request(format!("invalid hours: {hours}")));
    }

    let since = Utc::now() - Duration::hours(hours);
    let stats = state.store.stats(since).await.map_err(storage_error)?;

    Ok(Json(json!({
        "window_hours": hours,
        "total": stats.total,
        "critical": stats.critical,
        "high": stats.high,
        "medium": stats.medium,
        "by_provider": stats.by_provider,
        "by_kind": stats.by_kind,
        "estimated_monthly_savings": stats.open_cost_impact,
    })))
}

/// Mark an open finding as resolved
async fn resolve_anomaly(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let resolved = state
        .store
        .resolve_finding(id)
        .await
        .map_err(storage_error)?;

    if resolved {
        info!(finding_id = id, "Finding resolved via API");
        Ok(Json(json!({ "status": "resolved", "id": id })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no open finding with id {id}") })),
        ))
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/detect", post(trigger_detection))
        .route("/api/v1/anomalies", get(list_anomalies))
        .route("/api/v1/anomalies/:id/resolve", post(resolve_anomaly))
        .route("/api/v1/stats", get(stats))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
