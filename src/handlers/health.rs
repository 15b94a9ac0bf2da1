//! Health and infrastructure handlers: probes and Prometheus metrics.

use axum::{extract::State, http::StatusCode, response::Json};

use super::state::AppState;
use crate::metrics;

/// Health response for main health endpoint
#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub experiments_total: usize,
    pub experiments_active: usize,
    pub confidence_level: f64,
    pub event_retention_days: i64,
}

/// Main health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let summary = state.manager.summary();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        experiments_total: summary.total,
        experiments_active: summary.active,
        confidence_level: state.config.confidence_level,
        event_retention_days: state.config.event_retention_days,
    })
}

/// Liveness probe - returns 200 OK if the process is running
pub async fn health_live() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "alive",
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// Readiness probe - indicates if the service can handle traffic
pub async fn health_ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let summary = state.manager.summary();

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ready",
            "version": env!("CARGO_PKG_VERSION"),
            "experiments_total": summary.total,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint() -> String {
    metrics::gather()
}
