//! Experiment lifecycle handlers: create, list, inspect, transition,
//! delete.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::AppState;
use crate::errors::{AppError, ValidationErrorExt};
use crate::experiment::{Experiment, Variant};
use crate::validation;

/// One variant in a creation request.
#[derive(Debug, Deserialize)]
pub struct VariantSpec {
    pub name: String,
    pub weight: u32,
    #[serde(default)]
    pub promo_code: Option<String>,
    #[serde(default)]
    pub price_delta_cents: i64,
}

/// Request to create a new experiment.
#[derive(Debug, Deserialize)]
pub struct CreateExperimentRequest {
    pub name: String,
    #[serde(default)]
    pub product_ids: Vec<String>,
    pub variants: Vec<VariantSpec>,
}

#[derive(Debug, Serialize)]
pub struct CreateExperimentResponse {
    pub experiment_id: Uuid,
    pub variant_ids: Vec<Uuid>,
}

/// POST /api/experiments - Create a new price experiment
pub async fn create_experiment(
    State(state): State<AppState>,
    Json(req): Json<CreateExperimentRequest>,
) -> Result<Json<CreateExperimentResponse>, AppError> {
    validation::validate_name(&req.name).map_validation_err("name")?;
    validation::validate_product_ids(&req.product_ids).map_validation_err("product_ids")?;

    let mut variants = Vec::with_capacity(req.variants.len());
    for spec in &req.variants {
        validation::validate_name(&spec.name).map_validation_err("variants.name")?;
        validation::validate_weight(spec.weight).map_validation_err("variants.weight")?;
        if let Some(code) = &spec.promo_code {
            validation::validate_promo_code(code).map_validation_err("variants.promo_code")?;
        }
        variants.push(Variant::new(
            &spec.name,
            spec.weight,
            spec.promo_code.clone(),
            spec.price_delta_cents,
        ));
    }

    let experiment = Experiment::new(&req.name, req.product_ids, variants);
    let variant_ids = experiment.variants.iter().map(|v| v.id).collect();
    let experiment_id = state.manager.create(experiment)?;

    Ok(Json(CreateExperimentResponse {
        experiment_id,
        variant_ids,
    }))
}

/// GET /api/experiments - List all experiments
pub async fn list_experiments(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let experiments = state.manager.list();
    let summary = state.manager.summary();

    Ok(Json(serde_json::json!({
        "experiments": experiments.iter().map(|e| serde_json::json!({
            "id": e.id,
            "name": e.name,
            "status": e.status.as_str(),
            "variant_count": e.variants.len(),
            "product_ids": e.product_ids,
            "created_at": e.created_at.to_rfc3339(),
        })).collect::<Vec<_>>(),
        "summary": summary,
    })))
}

/// GET /api/experiments/{id} - Get one experiment with variants
pub async fn get_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let experiment = state.manager.get(id)?;

    Ok(Json(serde_json::json!({
        "id": experiment.id,
        "name": experiment.name,
        "status": experiment.status.as_str(),
        "product_ids": experiment.product_ids,
        "variants": experiment.variants.iter().map(|v| serde_json::json!({
            "id": v.id,
            "name": v.name,
            "weight": v.weight,
            "promo_code": v.promo_code,
            "price_delta_cents": v.price_delta_cents,
            "price_delta": crate::format::format_currency(v.price_delta_cents),
        })).collect::<Vec<_>>(),
        "created_at": experiment.created_at.to_rfc3339(),
        "activated_at": experiment.activated_at.map(|t| t.to_rfc3339()),
        "completed_at": experiment.completed_at.map(|t| t.to_rfc3339()),
    })))
}

/// DELETE /api/experiments/{id} - Delete an experiment and cascade
pub async fn delete_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.manager.delete(id)?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// POST /api/experiments/{id}/activate
pub async fn activate_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.manager.activate(id)?;
    Ok(Json(serde_json::json!({ "id": id, "status": "active" })))
}

/// POST /api/experiments/{id}/pause
pub async fn pause_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.manager.pause(id)?;
    Ok(Json(serde_json::json!({ "id": id, "status": "paused" })))
}

/// POST /api/experiments/{id}/resume
pub async fn resume_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.manager.resume(id)?;
    Ok(Json(serde_json::json!({ "id": id, "status": "active" })))
}

/// POST /api/experiments/{id}/complete
pub async fn complete_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.manager.complete(id)?;
    Ok(Json(serde_json::json!({ "id": id, "status": "completed" })))
}

/// POST /api/experiments/{id}/archive
pub async fn archive_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.manager.archive(id)?;
    Ok(Json(serde_json::json!({ "id": id, "status": "archived" })))
}
