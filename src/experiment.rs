//! Price experiment domain model.
//!
//! An experiment owns its variants; variants carry the price delta and
//! traffic weight. Lifecycle transitions are monotonic except for
//! pause/resume, and activation is gated on having a valid variant set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{MAX_VARIANT_WEIGHT, WEIGHT_TOTAL};

/// Lifecycle status of a price experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Being configured, not yet serving traffic
    Draft,
    /// Serving assignments and accepting events
    Active,
    /// No new assignments; existing assignments stay in force
    Paused,
    /// Concluded; still accepts purchase events for late attribution
    Completed,
    /// Historical record only
    Archived,
}

impl ExperimentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

/// One arm of an experiment: a price treatment with a traffic weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub name: String,
    /// Share of traffic in integer percent, 0..=100
    pub weight: u32,
    /// Discount code shown to bucketed visitors, if the variant has one
    pub promo_code: Option<String>,
    /// Signed price adjustment in minor currency units; negative = discount
    pub price_delta_cents: i64,
}

impl Variant {
    pub fn new(
        name: impl Into<String>,
        weight: u32,
        promo_code: Option<String>,
        price_delta_cents: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            weight,
            promo_code,
            price_delta_cents,
        }
    }
}

/// A price experiment and its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub id: Uuid,
    pub name: String,
    pub status: ExperimentStatus,
    /// Storefront products the experiment applies to
    pub product_ids: Vec<String>,
    /// Ordered; the first variant is the control arm
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Experiment {
    pub fn new(name: impl Into<String>, product_ids: Vec<String>, variants: Vec<Variant>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: ExperimentStatus::Draft,
            product_ids,
            variants,
            created_at: Utc::now(),
            activated_at: None,
            completed_at: None,
        }
    }

    /// The control arm, by convention the first variant.
    pub fn control_variant(&self) -> Option<&Variant> {
        self.variants.first()
    }

    pub fn variant(&self, variant_id: Uuid) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    /// Whether the variant set is valid for serving traffic: at least two
    /// arms, every weight in range, weights summing to exactly 100.
    pub fn validate_variants(&self) -> Result<(), ExperimentError> {
        if self.variants.len() < 2 {
            return Err(ExperimentError::TestNoVariants(self.id.to_string()));
        }
        for v in &self.variants {
            if v.weight > MAX_VARIANT_WEIGHT {
                return Err(ExperimentError::InvalidWeights(format!(
                    "variant '{}' has weight {} (max {})",
                    v.name, v.weight, MAX_VARIANT_WEIGHT
                )));
            }
        }
        let total: u32 = self.variants.iter().map(|v| v.weight).sum();
        if total != WEIGHT_TOTAL {
            return Err(ExperimentError::InvalidWeights(format!(
                "variant weights sum to {total}, expected {WEIGHT_TOTAL}"
            )));
        }
        Ok(())
    }

    pub fn activate(&mut self) -> Result<(), ExperimentError> {
        if self.status != ExperimentStatus::Draft {
            return Err(self.invalid_transition("activate"));
        }
        self.validate_variants()?;
        self.status = ExperimentStatus::Active;
        self.activated_at = Some(Utc::now());
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), ExperimentError> {
        if self.status != ExperimentStatus::Active {
            return Err(self.invalid_transition("pause"));
        }
        self.status = ExperimentStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ExperimentError> {
        if self.status != ExperimentStatus::Paused {
            return Err(self.invalid_transition("resume"));
        }
        self.status = ExperimentStatus::Active;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), ExperimentError> {
        if !matches!(
            self.status,
            ExperimentStatus::Active | ExperimentStatus::Paused
        ) {
            return Err(self.invalid_transition("complete"));
        }
        self.status = ExperimentStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn archive(&mut self) -> Result<(), ExperimentError> {
        if self.status != ExperimentStatus::Completed {
            return Err(self.invalid_transition("archive"));
        }
        self.status = ExperimentStatus::Archived;
        Ok(())
    }

    /// Whether the experiment accepts new visitor assignments.
    pub fn accepts_assignments(&self) -> bool {
        self.status == ExperimentStatus::Active
    }

    /// Whether the experiment accepts funnel events. Completed experiments
    /// still take events so late order notifications attribute correctly.
    pub fn accepts_events(&self) -> bool {
        matches!(
            self.status,
            ExperimentStatus::Active | ExperimentStatus::Completed
        )
    }

    fn invalid_transition(&self, action: &str) -> ExperimentError {
        ExperimentError::InvalidTransition(format!(
            "cannot {action} experiment in {} state",
            self.status.as_str()
        ))
    }
}

/// Errors from experiment, assignment and event operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExperimentError {
    #[error("Test not found: {0}")]
    TestNotFound(String),

    #[error("Test is not active: {0}")]
    TestNotActive(String),

    #[error("Test is not accepting events: {0}")]
    TestNotTracking(String),

    #[error("Test has no variants: {0}")]
    TestNoVariants(String),

    #[error("Test already exists: {0}")]
    TestAlreadyExists(String),

    #[error("Variant {variant_id} does not belong to test {experiment_id}")]
    VariantNotInTest {
        experiment_id: String,
        variant_id: String,
    },

    #[error("Invalid variant weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid state: {0}")]
    InvalidTransition(String),

    #[error("Assignment failed: {0}")]
    AssignmentFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
