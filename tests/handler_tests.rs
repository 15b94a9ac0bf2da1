//! Smoke tests for the HTTP handler endpoints.
//!
//! Each handler group gets at least one test verifying that valid requests
//! succeed on fresh state and that the documented error codes come back on
//! bad input.
//!
//! Run with: `cargo test --test handler_tests`

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use pricelab::config::ServerConfig;
use pricelab::handlers::{build_routes, AppContext};

// ═══════════════════════════════════════════════════════════════════════
// Test infrastructure
// ═══════════════════════════════════════════════════════════════════════

fn app() -> Router {
    build_routes(Arc::new(AppContext::new(ServerConfig::default())))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

/// Create a two-variant experiment and activate it; returns
/// (experiment_id, control_variant_id, treatment_variant_id).
async fn create_active_experiment(app: &Router) -> (String, String, String) {
    let (status, body) = send(
        app,
        post(
            "/api/experiments",
            json!({
                "name": "spring-sale",
                "product_ids": ["prod_1"],
                "variants": [
                    {"name": "control", "weight": 50},
                    {"name": "ten-off", "weight": 50, "promo_code": "TEN", "price_delta_cents": -1000}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");

    let experiment_id = body["experiment_id"].as_str().unwrap().to_string();
    let control = body["variant_ids"][0].as_str().unwrap().to_string();
    let treatment = body["variant_ids"][1].as_str().unwrap().to_string();

    let (status, body) = send(
        app,
        post(&format!("/api/experiments/{experiment_id}/activate"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "activate failed: {body}");

    (experiment_id, control, treatment)
}

// ═══════════════════════════════════════════════════════════════════════
// Health & metrics
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn health_endpoints_respond() {
    let app = app();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = send(&app, get("/health/live")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get("/health/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn metrics_endpoint_serves_text() {
    pricelab::metrics::register_metrics();
    let app = app();
    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ═══════════════════════════════════════════════════════════════════════
// Experiment lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn create_list_get_delete() {
    let app = app();
    let (experiment_id, _, _) = create_active_experiment(&app).await;

    let (status, body) = send(&app, get("/api/experiments")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["experiments"].as_array().unwrap().len(), 1);
    assert_eq!(body["summary"]["active"], 1);

    let (status, body) = send(&app, get(&format!("/api/experiments/{experiment_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["variants"][1]["price_delta"], "-$10.00");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/experiments/{experiment_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get(&format!("/api/experiments/{experiment_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TEST_NOT_FOUND");
}

#[tokio::test]
async fn activation_rejects_bad_weights() {
    let app = app();
    let (status, body) = send(
        &app,
        post(
            "/api/experiments",
            json!({
                "name": "lopsided",
                "variants": [
                    {"name": "a", "weight": 60},
                    {"name": "b", "weight": 60}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["experiment_id"].as_str().unwrap().to_string();

    let (status, body) =
        send(&app, post(&format!("/api/experiments/{id}/activate"), json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn out_of_range_weight_is_rejected_at_creation() {
    let app = app();
    let (status, body) = send(
        &app,
        post(
            "/api/experiments",
            json!({
                "name": "overweight",
                "variants": [
                    {"name": "a", "weight": 150},
                    {"name": "b", "weight": 50}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

// ═══════════════════════════════════════════════════════════════════════
// Assignment
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn assignment_resolves_and_sticks() {
    let app = app();
    let (experiment_id, _, _) = create_active_experiment(&app).await;
    let uri = format!("/api/experiments/{experiment_id}/assignment");

    let (status, first) = send(&app, post(&uri, json!({"visitor_id": "visitor-1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["is_fresh_assignment"], true);

    let (status, second) = send(&app, post(&uri, json!({"visitor_id": "visitor-1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["is_fresh_assignment"], false);
    assert_eq!(second["variant_id"], first["variant_id"]);
}

#[tokio::test]
async fn assignment_rejects_unknown_and_inactive_experiments() {
    let app = app();

    let (status, body) = send(
        &app,
        post(
            "/api/experiments/00000000-0000-0000-0000-000000000000/assignment",
            json!({"visitor_id": "visitor-1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TEST_NOT_FOUND");

    // Draft experiment: exists but is not serving
    let (status, body) = send(
        &app,
        post(
            "/api/experiments",
            json!({
                "name": "draft-only",
                "variants": [
                    {"name": "a", "weight": 50},
                    {"name": "b", "weight": 50}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["experiment_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post(
            &format!("/api/experiments/{id}/assignment"),
            json!({"visitor_id": "visitor-1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "TEST_NOT_ACTIVE");
}

#[tokio::test]
async fn assignment_rejects_malformed_visitor_id() {
    let app = app();
    let (experiment_id, _, _) = create_active_experiment(&app).await;

    let (status, body) = send(
        &app,
        post(
            &format!("/api/experiments/{experiment_id}/assignment"),
            json!({"visitor_id": "has spaces!"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

// ═══════════════════════════════════════════════════════════════════════
// Events
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn purchase_events_deduplicate_by_order_id() {
    let app = app();
    let (experiment_id, control, _) = create_active_experiment(&app).await;
    let uri = format!("/api/experiments/{experiment_id}/events");

    let purchase = json!({
        "visitor_id": "visitor-1",
        "variant_id": control,
        "kind": "purchase",
        "order_id": "order-42",
        "revenue_cents": 2599
    });

    let (status, body) = send(&app, post(&uri, purchase.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], true);
    assert_eq!(body["duplicate"], false);

    // Redelivered notification: a no-op, not an error
    let (status, body) = send(&app, post(&uri, purchase)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], false);
    assert_eq!(body["duplicate"], true);
}

#[tokio::test]
async fn negative_revenue_is_rejected() {
    let app = app();
    let (experiment_id, control, _) = create_active_experiment(&app).await;

    let (status, body) = send(
        &app,
        post(
            &format!("/api/experiments/{experiment_id}/events"),
            json!({
                "visitor_id": "visitor-1",
                "variant_id": control,
                "kind": "purchase",
                "order_id": "order-1",
                "revenue_cents": -500
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn event_rejects_variant_from_another_experiment() {
    let app = app();
    let (experiment_id, _, _) = create_active_experiment(&app).await;

    let (status, body) = send(
        &app,
        post(
            &format!("/api/experiments/{experiment_id}/events"),
            json!({
                "visitor_id": "visitor-1",
                "variant_id": "11111111-1111-1111-1111-111111111111",
                "kind": "view"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "VARIANT_NOT_IN_TEST");
}

// ═══════════════════════════════════════════════════════════════════════
// Analysis & planning
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn analyze_returns_composite_result_per_arm() {
    let app = app();
    let (experiment_id, _, _) = create_active_experiment(&app).await;
    let assign_uri = format!("/api/experiments/{experiment_id}/assignment");
    let events_uri = format!("/api/experiments/{experiment_id}/events");

    // Bucket some visitors and convert a few
    for i in 0..30 {
        let visitor = format!("visitor-{i}");
        let (_, assigned) = send(&app, post(&assign_uri, json!({"visitor_id": visitor}))).await;
        if i % 10 == 0 {
            let (status, _) = send(
                &app,
                post(
                    &events_uri,
                    json!({
                        "visitor_id": visitor,
                        "variant_id": assigned["variant_id"],
                        "kind": "purchase",
                        "order_id": format!("order-{i}"),
                        "revenue_cents": 3500
                    }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }
    }

    let (status, body) = send(
        &app,
        get(&format!("/api/experiments/{experiment_id}/analyze")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let arms = body["arms"].as_array().unwrap();
    assert_eq!(arms.len(), 1);
    let arm = &arms[0];
    assert_eq!(arm["winner"], "none");
    assert!(arm["recommendation"].as_str().unwrap().contains("more data"));
    assert!(arm["conversion"]["recommended_sample_size"].as_u64().unwrap() > 30);
}

#[tokio::test]
async fn ad_hoc_conversion_significance() {
    let app = app();

    let (status, body) = send(
        &app,
        post(
            "/api/stats/conversion",
            json!({
                "control": {"visitors": 1000, "conversions": 30},
                "treatment": {"visitors": 1000, "conversions": 40}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["control_rate"].as_f64().unwrap() - 0.03).abs() < 1e-12);
    assert!((body["treatment_rate"].as_f64().unwrap() - 0.04).abs() < 1e-12);
    assert!((body["relative_lift"].as_f64().unwrap() - 100.0 / 3.0).abs() < 1e-6);

    // Confidence level outside [0.5, 1) is a field error
    let (status, body) = send(
        &app,
        post(
            "/api/stats/conversion",
            json!({
                "control": {"visitors": 100, "conversions": 3},
                "treatment": {"visitors": 100, "conversions": 4},
                "confidence_level": 1.2
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn ad_hoc_revenue_significance_takes_raw_samples() {
    let app = app();

    let (status, body) = send(
        &app,
        post(
            "/api/stats/revenue",
            json!({
                "control": {"visitors": 200, "conversions": 50, "revenue": 10000},
                "treatment": {"visitors": 200, "conversions": 50, "revenue": 12000},
                "control_samples": [195.0, 198.0, 201.0, 204.0, 202.0],
                "treatment_samples": [235.0, 238.0, 241.0, 244.0, 242.0]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["control_rpv"].as_f64().unwrap() - 50.0).abs() < 1e-12);
    assert!((body["treatment_rpv"].as_f64().unwrap() - 60.0).abs() < 1e-12);
    assert!(body["t_statistic"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn ad_hoc_analysis_applies_the_sample_size_gate() {
    let app = app();

    let (status, body) = send(
        &app,
        post(
            "/api/stats/analyze",
            json!({
                "control": {"visitors": 100, "conversions": 3, "revenue": 9000},
                "treatment": {"visitors": 100, "conversions": 4, "revenue": 12000}
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["winner"], "none");
    assert!(body["recommendation"].as_str().unwrap().contains("more data"));
    assert_eq!(body["conversion"]["sample_size_reached"], false);
}

#[tokio::test]
async fn sample_size_planner() {
    let app = app();

    let (status, body) = send(
        &app,
        get("/api/planner/sample-size?baseline_rate=0.03&relative_mde=0.05&daily_visitors=10000"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["required_sample_size"].as_u64().unwrap() > 100_000);
    assert!(body["days_to_significance"].as_u64().unwrap() > 0);

    let (status, body) = send(
        &app,
        get("/api/planner/sample-size?baseline_rate=1.5&relative_mde=0.05"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}
