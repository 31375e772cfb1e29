//! Core library for cloud cost anomaly detection
//!
//! This crate provides:
//! - Threshold rules turning metric snapshots into findings
//! - Detection orchestration across providers
//! - Severity-based alert dispatch
//! - Finding persistence (SQLite)
//! - Periodic scheduling with per-provider timeouts
//! - Health checks and observability

pub mod adapter;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod models;
pub mod notify;
pub mod observability;
pub mod orchestrator;
pub mod pricing;
pub mod rules;
pub mod scheduler;
pub mod store;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::SentinelMetrics;
