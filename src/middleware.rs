//! HTTP request tracking middleware for observability.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::Instant;

/// Middleware to track HTTP request latency and counts
pub async fn track_metrics(req: Request, next: Next) -> Result<Response, StatusCode> {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    // Normalize path to avoid high cardinality (group dynamic IDs)
    let normalized_path = normalize_path(&path);

    crate::metrics::HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &normalized_path, &status])
        .observe(duration);

    crate::metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &normalized_path, &status])
        .inc();

    Ok(response)
}

/// Normalize path to prevent metric cardinality explosion
/// /api/experiments/550e.../analyze -> /api/experiments/{id}/analyze
fn normalize_path(path: &str) -> String {
    let mut normalized = Vec::new();

    for part in path.split('/') {
        if part.is_empty() {
            continue;
        }

        if is_id(part) {
            normalized.push("{id}");
        } else {
            normalized.push(part);
        }
    }

    format!("/{}", normalized.join("/"))
}

/// Check if a path segment looks like an ID (UUID or numeric)
fn is_id(segment: &str) -> bool {
    // UUID pattern
    if segment.contains('-') && segment.len() >= 32 {
        return true;
    }

    // Numeric ID
    if !segment.is_empty() && segment.chars().all(|c| c.is_numeric()) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/api/experiments/550e8400-e29b-41d4-a716-446655440000"),
            "/api/experiments/{id}"
        );
        assert_eq!(
            normalize_path("/api/experiments/550e8400-e29b-41d4-a716-446655440000/analyze"),
            "/api/experiments/{id}/analyze"
        );
        assert_eq!(normalize_path("/health"), "/health");
    }
}
