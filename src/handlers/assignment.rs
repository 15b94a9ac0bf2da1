//! Visitor bucketing handler.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::AppState;
use crate::errors::{AppError, ValidationErrorExt};
use crate::validation;

/// Request from the storefront script to resolve a visitor's variant.
#[derive(Debug, Deserialize)]
pub struct ResolveAssignmentRequest {
    pub visitor_id: String,
    #[serde(default)]
    pub product_id: Option<String>,
}

/// The variant descriptor the storefront renders from.
#[derive(Debug, Serialize)]
pub struct ResolveAssignmentResponse {
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub variant_name: String,
    pub promo_code: Option<String>,
    pub price_delta_cents: i64,
    pub is_fresh_assignment: bool,
}

/// POST /api/experiments/{id}/assignment - Resolve (and on first touch,
/// create) the visitor's assignment
#[tracing::instrument(skip(state), fields(visitor_id = %req.visitor_id))]
pub async fn resolve_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResolveAssignmentRequest>,
) -> Result<Json<ResolveAssignmentResponse>, AppError> {
    validation::validate_visitor_id(&req.visitor_id).map_validation_err("visitor_id")?;

    let resolved = state.manager.resolve_assignment(id, &req.visitor_id)?;
    if resolved.is_fresh_assignment {
        tracing::debug!(
            experiment_id = %id,
            variant = %resolved.variant_name,
            product_id = req.product_id.as_deref().unwrap_or(""),
            "visitor bucketed"
        );
    }

    Ok(Json(ResolveAssignmentResponse {
        experiment_id: id,
        variant_id: resolved.variant_id,
        variant_name: resolved.variant_name,
        promo_code: resolved.promo_code,
        price_delta_cents: resolved.price_delta_cents,
        is_fresh_assignment: resolved.is_fresh_assignment,
    }))
}
