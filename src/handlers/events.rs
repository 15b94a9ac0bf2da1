//! Funnel event recording handler.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::AppState;
use crate::errors::{AppError, ValidationErrorExt};
use crate::events::{AppendOutcome, EventKind};
use crate::validation;

/// Request to record one funnel event. The tagged `kind` plus explicit
/// optional fields replaces the loosely-typed payloads the storefront
/// script would otherwise send.
#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub visitor_id: String,
    pub variant_id: Uuid,
    pub kind: EventKind,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    /// Signed at the boundary so negatives fail validation, not parsing
    #[serde(default)]
    pub revenue_cents: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    pub recorded: bool,
    /// True when a purchase was dropped as an already-seen order id
    pub duplicate: bool,
}

/// POST /api/experiments/{id}/events - Record a funnel event
pub async fn record_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RecordEventRequest>,
) -> Result<Json<RecordEventResponse>, AppError> {
    validation::validate_visitor_id(&req.visitor_id).map_validation_err("visitor_id")?;
    if let Some(order_id) = &req.order_id {
        validation::validate_order_id(order_id).map_validation_err("order_id")?;
    }
    let revenue_cents = req
        .revenue_cents
        .map(|cents| validation::validate_revenue_cents(cents).map_validation_err("revenue_cents"))
        .transpose()?;

    let outcome = state.manager.record_event(
        id,
        req.variant_id,
        &req.visitor_id,
        req.kind,
        req.product_id,
        req.order_id,
        revenue_cents,
    )?;

    Ok(Json(RecordEventResponse {
        recorded: outcome == AppendOutcome::Recorded,
        duplicate: outcome == AppendOutcome::DuplicatePurchase,
    }))
}
