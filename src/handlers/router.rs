//! Router configuration - centralized route definitions.
//!
//! Builds the axum router from the handler submodules. Routes are grouped
//! by domain; probes and metrics come first so they are never shadowed.

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;
use super::{analysis, assignment, events, experiments, health};

/// Build the full application router.
pub fn build_routes(state: AppState) -> Router {
    Router::new()
        // =================================================================
        // HEALTH & KUBERNETES PROBES
        // =================================================================
        .route("/health", get(health::health))
        .route("/health/live", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        // =================================================================
        // METRICS (PROMETHEUS)
        // =================================================================
        .route("/metrics", get(health::metrics_endpoint))
        // =================================================================
        // EXPERIMENT LIFECYCLE
        // =================================================================
        .route("/api/experiments", post(experiments::create_experiment))
        .route("/api/experiments", get(experiments::list_experiments))
        .route("/api/experiments/{id}", get(experiments::get_experiment))
        .route(
            "/api/experiments/{id}",
            delete(experiments::delete_experiment),
        )
        .route(
            "/api/experiments/{id}/activate",
            post(experiments::activate_experiment),
        )
        .route(
            "/api/experiments/{id}/pause",
            post(experiments::pause_experiment),
        )
        .route(
            "/api/experiments/{id}/resume",
            post(experiments::resume_experiment),
        )
        .route(
            "/api/experiments/{id}/complete",
            post(experiments::complete_experiment),
        )
        .route(
            "/api/experiments/{id}/archive",
            post(experiments::archive_experiment),
        )
        // =================================================================
        // BUCKETING & EVENTS
        // =================================================================
        .route(
            "/api/experiments/{id}/assignment",
            post(assignment::resolve_assignment),
        )
        .route("/api/experiments/{id}/events", post(events::record_event))
        // =================================================================
        // ANALYSIS & PLANNING
        // =================================================================
        .route(
            "/api/experiments/{id}/analyze",
            get(analysis::analyze_experiment),
        )
        .route(
            "/api/stats/conversion",
            post(analysis::compute_conversion_significance),
        )
        .route(
            "/api/stats/revenue",
            post(analysis::compute_revenue_significance),
        )
        .route("/api/stats/analyze", post(analysis::compute_analysis))
        .route("/api/planner/sample-size", get(analysis::sample_size))
        // =================================================================
        // STATE
        // =================================================================
        .with_state(state)
}
