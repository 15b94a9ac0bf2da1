//! Analysis handlers: per-experiment significance plus the standalone
//! calculators the dashboard uses for test planning.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::state::AppState;
use crate::constants::{DEFAULT_CONFIDENCE_LEVEL, DEFAULT_POWER, DEFAULT_SIGNIFICANCE_LEVEL};
use crate::errors::{AppError, ValidationErrorExt};
use crate::format::format_lift;
use crate::stats::{self, VariantStats};
use crate::validation;

/// GET /api/experiments/{id}/analyze - Composite analysis per treatment arm
pub async fn analyze_experiment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let analysis = state.manager.analyze(id)?;

    Ok(Json(serde_json::json!({
        "experiment_id": analysis.experiment_id,
        "control_variant_id": analysis.control_variant_id,
        "control_stats": analysis.control_stats,
        "control_funnel": analysis.control_funnel,
        "arms": analysis.arms.iter().map(|arm| serde_json::json!({
            "variant_id": arm.variant_id,
            "variant_name": arm.variant_name,
            "stats": arm.stats,
            "funnel": arm.funnel,
            "conversion": arm.analysis.conversion,
            "revenue": arm.analysis.revenue,
            "winner": arm.analysis.winner,
            "recommendation": arm.analysis.recommendation,
            "conversion_lift": format_lift(arm.analysis.conversion.relative_lift),
            "revenue_lift": format_lift(arm.analysis.revenue.relative_lift),
        })).collect::<Vec<_>>(),
    })))
}

/// Ad-hoc significance request over caller-supplied aggregates. Lets the
/// dashboard run what-if comparisons without touching stored experiments.
#[derive(Debug, Deserialize)]
pub struct SignificanceRequest {
    pub control: VariantStats,
    pub treatment: VariantStats,
    #[serde(default)]
    pub confidence_level: Option<f64>,
    /// Per-order revenue amounts in cents; used by the revenue test's
    /// sample-variance path when both arms carry at least two orders
    #[serde(default)]
    pub control_samples: Option<Vec<f64>>,
    #[serde(default)]
    pub treatment_samples: Option<Vec<f64>>,
}

impl SignificanceRequest {
    fn confidence(&self) -> Result<f64, AppError> {
        let level = self.confidence_level.unwrap_or(DEFAULT_CONFIDENCE_LEVEL);
        validation::validate_confidence_level(level).map_validation_err("confidence_level")?;
        Ok(level)
    }
}

/// POST /api/stats/conversion - Two-proportion z-test over raw aggregates
pub async fn compute_conversion_significance(
    Json(req): Json<SignificanceRequest>,
) -> Result<Json<stats::ConversionSignificance>, AppError> {
    let confidence = req.confidence()?;
    Ok(Json(stats::conversion_significance(
        &req.control,
        &req.treatment,
        confidence,
    )))
}

/// POST /api/stats/revenue - Welch-style revenue test over raw aggregates
pub async fn compute_revenue_significance(
    Json(req): Json<SignificanceRequest>,
) -> Result<Json<stats::RevenueSignificance>, AppError> {
    let confidence = req.confidence()?;
    Ok(Json(stats::revenue_significance(
        &req.control,
        &req.treatment,
        req.control_samples.as_deref(),
        req.treatment_samples.as_deref(),
        confidence,
    )))
}

/// POST /api/stats/analyze - Composite verdict over raw aggregates
pub async fn compute_analysis(
    Json(req): Json<SignificanceRequest>,
) -> Result<Json<stats::TestAnalysis>, AppError> {
    let confidence = req.confidence()?;
    Ok(Json(stats::analyze(
        &req.control,
        &req.treatment,
        req.control_samples.as_deref(),
        req.treatment_samples.as_deref(),
        confidence,
    )))
}

/// Query parameters for the sample-size planner.
#[derive(Debug, Deserialize)]
pub struct SampleSizeQuery {
    pub baseline_rate: f64,
    pub relative_mde: f64,
    #[serde(default = "default_power")]
    pub power: f64,
    #[serde(default = "default_significance")]
    pub significance_level: f64,
    #[serde(default)]
    pub daily_visitors: Option<u64>,
    #[serde(default = "default_num_variants")]
    pub num_variants: u64,
}

fn default_power() -> f64 {
    DEFAULT_POWER
}

fn default_significance() -> f64 {
    DEFAULT_SIGNIFICANCE_LEVEL
}

fn default_num_variants() -> u64 {
    2
}

/// GET /api/planner/sample-size - Required per-arm sample size, and the
/// calendar estimate when daily traffic is supplied
pub async fn sample_size(
    Query(query): Query<SampleSizeQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !(0.0..1.0).contains(&query.baseline_rate) {
        return Err(AppError::InvalidInput {
            field: "baseline_rate".to_string(),
            reason: format!("must be in [0, 1), got {}", query.baseline_rate),
        });
    }
    if query.relative_mde <= 0.0 {
        return Err(AppError::InvalidInput {
            field: "relative_mde".to_string(),
            reason: format!("must be positive, got {}", query.relative_mde),
        });
    }

    let required = stats::required_sample_size(
        query.baseline_rate,
        query.relative_mde,
        query.power,
        query.significance_level,
    );

    let days = query.daily_visitors.map(|daily| {
        stats::days_to_significance(
            daily,
            query.baseline_rate,
            query.relative_mde,
            query.num_variants,
        )
    });

    Ok(Json(serde_json::json!({
        "required_sample_size": required,
        "per_arm": true,
        "days_to_significance": days,
    })))
}
