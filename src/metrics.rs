//! Operational metrics with Prometheus.
//!
//! Exposes assignment, event and analysis counters for monitoring and
//! alerting. Labels stay low-cardinality on purpose: outcomes and event
//! kinds, never experiment or visitor ids.

use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Global metrics registry
    pub static ref METRICS_REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Request metrics
    // ============================================================================

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "pricelab_http_request_duration_seconds",
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["method", "endpoint", "status"]
    ).unwrap();

    /// Total HTTP requests
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pricelab_http_requests_total", "Total HTTP requests"),
        &["method", "endpoint", "status"]
    ).unwrap();

    // ============================================================================
    // Assignment metrics
    // ============================================================================

    /// Assignment resolutions by outcome: fresh, existing, race_lost
    pub static ref ASSIGNMENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pricelab_assignments_total", "Visitor assignment resolutions"),
        &["outcome"]
    ).unwrap();

    // ============================================================================
    // Event metrics
    // ============================================================================

    /// Funnel events by kind and result: recorded, duplicate
    pub static ref EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pricelab_events_total", "Funnel events recorded"),
        &["kind", "result"]
    ).unwrap();

    // ============================================================================
    // Analysis metrics
    // ============================================================================

    /// Time spent aggregating and analyzing an experiment
    pub static ref ANALYSIS_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pricelab_analysis_duration_seconds",
            "Experiment analysis duration"
        )
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5])
    ).unwrap();
}

/// Register all metrics with the global registry. Call once at startup.
pub fn register_metrics() {
    let registry = &METRICS_REGISTRY;
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .ok();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .ok();
    registry.register(Box::new(ASSIGNMENTS_TOTAL.clone())).ok();
    registry.register(Box::new(EVENTS_TOTAL.clone())).ok();
    registry.register(Box::new(ANALYSIS_DURATION.clone())).ok();
}

/// Render the registry in Prometheus text exposition format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = METRICS_REGISTRY.gather();
    encoder.encode_to_string(&families).unwrap_or_default()
}
