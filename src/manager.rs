//! Experiment manager: lifecycle, visitor bucketing, event recording and
//! on-demand analysis over injected stores.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assignment::{
    pick_weighted, total_weight, Assignment, AssignmentStore, StoreError,
};
use crate::events::{AppendOutcome, Event, EventKind, EventStore};
use crate::experiment::{Experiment, ExperimentError, ExperimentStatus};
use crate::metrics;
use crate::stats::{self, TestAnalysis, VariantStats};

/// What a bucketing request resolves to: everything the storefront script
/// needs to render the variant's price.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedVariant {
    pub variant_id: Uuid,
    pub variant_name: String,
    pub promo_code: Option<String>,
    pub price_delta_cents: i64,
    /// True when this request created the assignment; false when the
    /// visitor was already bucketed (including losing a creation race)
    pub is_fresh_assignment: bool,
}

/// View / add-to-cart / purchase counts for one arm.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FunnelCounts {
    pub views: u64,
    pub add_to_carts: u64,
    pub purchases: u64,
}

/// Composite analysis of one treatment arm against the control.
#[derive(Debug, Clone, Serialize)]
pub struct ArmAnalysis {
    pub variant_id: Uuid,
    pub variant_name: String,
    pub stats: VariantStats,
    pub funnel: FunnelCounts,
    pub analysis: TestAnalysis,
}

/// Full analysis of an experiment: control stats plus one composite result
/// per treatment arm.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentAnalysis {
    pub experiment_id: Uuid,
    pub control_variant_id: Uuid,
    pub control_stats: VariantStats,
    pub control_funnel: FunnelCounts,
    pub arms: Vec<ArmAnalysis>,
}

/// Counts by lifecycle status, for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerSummary {
    pub total: usize,
    pub draft: usize,
    pub active: usize,
    pub paused: usize,
    pub completed: usize,
    pub archived: usize,
}

/// Owns the experiment registry and coordinates the stores. Statelessness
/// boundary: all math lives in [`crate::stats`]; all durable writes go
/// through the injected store handles, never module-level globals.
pub struct ExperimentManager {
    experiments: RwLock<HashMap<Uuid, Experiment>>,
    assignments: Arc<dyn AssignmentStore>,
    events: Arc<dyn EventStore>,
    confidence_level: f64,
}

impl ExperimentManager {
    pub fn new(
        assignments: Arc<dyn AssignmentStore>,
        events: Arc<dyn EventStore>,
        confidence_level: f64,
    ) -> Self {
        Self {
            experiments: RwLock::new(HashMap::new()),
            assignments,
            events,
            confidence_level,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn create(&self, experiment: Experiment) -> Result<Uuid, ExperimentError> {
        let id = experiment.id;
        let mut experiments = self.experiments.write();
        if experiments.contains_key(&id) {
            return Err(ExperimentError::TestAlreadyExists(id.to_string()));
        }
        info!(experiment_id = %id, name = %experiment.name, "experiment created");
        experiments.insert(id, experiment);
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Result<Experiment, ExperimentError> {
        self.experiments
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| ExperimentError::TestNotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<Experiment> {
        let mut all: Vec<_> = self.experiments.read().values().cloned().collect();
        all.sort_by_key(|e| e.created_at);
        all
    }

    pub fn activate(&self, id: Uuid) -> Result<(), ExperimentError> {
        self.with_experiment_mut(id, |exp| {
            exp.activate()?;
            info!(experiment_id = %id, "experiment activated");
            Ok(())
        })
    }

    pub fn pause(&self, id: Uuid) -> Result<(), ExperimentError> {
        self.with_experiment_mut(id, |exp| exp.pause())
    }

    pub fn resume(&self, id: Uuid) -> Result<(), ExperimentError> {
        self.with_experiment_mut(id, |exp| exp.resume())
    }

    pub fn complete(&self, id: Uuid) -> Result<(), ExperimentError> {
        self.with_experiment_mut(id, |exp| {
            exp.complete()?;
            info!(experiment_id = %id, "experiment completed");
            Ok(())
        })
    }

    pub fn archive(&self, id: Uuid) -> Result<(), ExperimentError> {
        self.with_experiment_mut(id, |exp| exp.archive())
    }

    /// Delete an experiment and cascade to its assignments and events.
    pub fn delete(&self, id: Uuid) -> Result<(), ExperimentError> {
        let removed = self.experiments.write().remove(&id);
        if removed.is_none() {
            return Err(ExperimentError::TestNotFound(id.to_string()));
        }
        let assignments = self
            .assignments
            .remove_experiment(id)
            .map_err(|e| ExperimentError::Storage(e.to_string()))?;
        let events = self
            .events
            .remove_experiment(id)
            .map_err(|e| ExperimentError::Storage(e.to_string()))?;
        info!(
            experiment_id = %id,
            assignments_removed = assignments,
            events_removed = events,
            "experiment deleted"
        );
        Ok(())
    }

    pub fn summary(&self) -> ManagerSummary {
        let experiments = self.experiments.read();
        let mut summary = ManagerSummary {
            total: experiments.len(),
            draft: 0,
            active: 0,
            paused: 0,
            completed: 0,
            archived: 0,
        };
        for exp in experiments.values() {
            match exp.status {
                ExperimentStatus::Draft => summary.draft += 1,
                ExperimentStatus::Active => summary.active += 1,
                ExperimentStatus::Paused => summary.paused += 1,
                ExperimentStatus::Completed => summary.completed += 1,
                ExperimentStatus::Archived => summary.archived += 1,
            }
        }
        summary
    }

    // ------------------------------------------------------------------
    // Assignment protocol
    // ------------------------------------------------------------------

    /// Resolve a visitor to a variant, creating the assignment on first
    /// touch.
    ///
    /// The check-then-insert here is deliberately not atomic; the store's
    /// uniqueness constraint is. Two concurrent first requests both pass
    /// the lookup, both draw a variant, and exactly one insert lands. The
    /// loser observes the conflict and adopts the winner's assignment with
    /// a single re-read; there is no retry loop and no lock.
    pub fn resolve_assignment(
        &self,
        experiment_id: Uuid,
        visitor_id: &str,
    ) -> Result<ResolvedVariant, ExperimentError> {
        let experiment = self.get(experiment_id)?;
        if !experiment.accepts_assignments() {
            return Err(ExperimentError::TestNotActive(experiment_id.to_string()));
        }

        if let Some(existing) = self
            .assignments
            .find(experiment_id, visitor_id)
            .map_err(|e| ExperimentError::Storage(e.to_string()))?
        {
            metrics::ASSIGNMENTS_TOTAL.with_label_values(&["existing"]).inc();
            return self.resolved(&experiment, existing.variant_id, false);
        }

        if experiment.variants.is_empty() {
            return Err(ExperimentError::TestNoVariants(experiment_id.to_string()));
        }

        let total = total_weight(&experiment.variants);
        let draw = if total > 0.0 {
            rand::thread_rng().gen_range(0.0..total)
        } else {
            0.0
        };
        let chosen = pick_weighted(&experiment.variants, draw).id;

        match self
            .assignments
            .insert(Assignment::new(experiment_id, chosen, visitor_id))
        {
            Ok(()) => {
                metrics::ASSIGNMENTS_TOTAL.with_label_values(&["fresh"]).inc();
                self.resolved(&experiment, chosen, true)
            }
            Err(StoreError::Conflict) => {
                // Lost the first-touch race: another request inserted the
                // assignment between our lookup and insert. Theirs wins.
                metrics::ASSIGNMENTS_TOTAL
                    .with_label_values(&["race_lost"])
                    .inc();
                let winner = self
                    .assignments
                    .find(experiment_id, visitor_id)
                    .map_err(|e| ExperimentError::Storage(e.to_string()))?
                    .ok_or_else(|| {
                        ExperimentError::AssignmentFailed(format!(
                            "conflict on insert but no assignment found for \
                             experiment {experiment_id}, visitor {visitor_id}"
                        ))
                    })?;
                warn!(
                    experiment_id = %experiment_id,
                    visitor_id = %visitor_id,
                    "assignment race lost, adopting winner"
                );
                self.resolved(&experiment, winner.variant_id, false)
            }
            Err(other) => Err(ExperimentError::AssignmentFailed(other.to_string())),
        }
    }

    fn resolved(
        &self,
        experiment: &Experiment,
        variant_id: Uuid,
        is_fresh: bool,
    ) -> Result<ResolvedVariant, ExperimentError> {
        let variant = experiment.variant(variant_id).ok_or_else(|| {
            ExperimentError::VariantNotInTest {
                experiment_id: experiment.id.to_string(),
                variant_id: variant_id.to_string(),
            }
        })?;
        Ok(ResolvedVariant {
            variant_id: variant.id,
            variant_name: variant.name.clone(),
            promo_code: variant.promo_code.clone(),
            price_delta_cents: variant.price_delta_cents,
            is_fresh_assignment: is_fresh,
        })
    }

    // ------------------------------------------------------------------
    // Event tracking
    // ------------------------------------------------------------------

    /// Record a funnel event. Duplicate purchases (same order id) are
    /// absorbed as no-ops so redelivered order notifications stay
    /// harmless.
    pub fn record_event(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
        visitor_id: &str,
        kind: EventKind,
        product_id: Option<String>,
        order_id: Option<String>,
        revenue_cents: Option<u64>,
    ) -> Result<AppendOutcome, ExperimentError> {
        let experiment = self.get(experiment_id)?;
        if !experiment.accepts_events() {
            return Err(ExperimentError::TestNotTracking(experiment_id.to_string()));
        }
        if experiment.variant(variant_id).is_none() {
            return Err(ExperimentError::VariantNotInTest {
                experiment_id: experiment_id.to_string(),
                variant_id: variant_id.to_string(),
            });
        }

        let outcome = self
            .events
            .append(Event {
                experiment_id,
                variant_id,
                visitor_id: visitor_id.to_string(),
                kind,
                product_id,
                order_id,
                revenue_cents,
                created_at: Utc::now(),
            })
            .map_err(|e| ExperimentError::Storage(e.to_string()))?;

        let result = match outcome {
            AppendOutcome::Recorded => "recorded",
            AppendOutcome::DuplicatePurchase => "duplicate",
        };
        metrics::EVENTS_TOTAL
            .with_label_values(&[kind.as_str(), result])
            .inc();
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------

    /// Aggregate one variant's stats from the stores.
    pub fn stats_for_variant(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<VariantStats, ExperimentError> {
        let visitors = self
            .assignments
            .count_for_variant(experiment_id, variant_id)
            .map_err(|e| ExperimentError::Storage(e.to_string()))?;
        let (conversions, revenue) = self
            .events
            .purchase_totals(experiment_id, variant_id)
            .map_err(|e| ExperimentError::Storage(e.to_string()))?;
        Ok(VariantStats {
            visitors,
            conversions,
            revenue,
        })
    }

    fn funnel_for_variant(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<FunnelCounts, ExperimentError> {
        let (views, add_to_carts, purchases) = self
            .events
            .kind_counts(experiment_id, variant_id)
            .map_err(|e| ExperimentError::Storage(e.to_string()))?;
        Ok(FunnelCounts {
            views,
            add_to_carts,
            purchases,
        })
    }

    /// Analyze every treatment arm against the control (the first
    /// variant). Per-order revenue samples are fed to the revenue test
    /// when both arms have at least two orders.
    pub fn analyze(&self, experiment_id: Uuid) -> Result<ExperimentAnalysis, ExperimentError> {
        let timer = metrics::ANALYSIS_DURATION.start_timer();
        let experiment = self.get(experiment_id)?;
        let control = experiment
            .control_variant()
            .ok_or_else(|| ExperimentError::TestNoVariants(experiment_id.to_string()))?
            .clone();

        let control_stats = self.stats_for_variant(experiment_id, control.id)?;
        let control_funnel = self.funnel_for_variant(experiment_id, control.id)?;
        let control_samples = self
            .events
            .revenue_samples(experiment_id, control.id)
            .map_err(|e| ExperimentError::Storage(e.to_string()))?;

        let mut arms = Vec::new();
        for variant in experiment.variants.iter().skip(1) {
            let treatment_stats = self.stats_for_variant(experiment_id, variant.id)?;
            let treatment_samples = self
                .events
                .revenue_samples(experiment_id, variant.id)
                .map_err(|e| ExperimentError::Storage(e.to_string()))?;

            let analysis = stats::analyze(
                &control_stats,
                &treatment_stats,
                Some(control_samples.as_slice()),
                Some(treatment_samples.as_slice()),
                self.confidence_level,
            );
            arms.push(ArmAnalysis {
                variant_id: variant.id,
                variant_name: variant.name.clone(),
                stats: treatment_stats,
                funnel: self.funnel_for_variant(experiment_id, variant.id)?,
                analysis,
            });
        }
        timer.observe_duration();

        Ok(ExperimentAnalysis {
            experiment_id,
            control_variant_id: control.id,
            control_stats,
            control_funnel,
            arms,
        })
    }

    // ------------------------------------------------------------------
    // Retention
    // ------------------------------------------------------------------

    /// Drop events older than the retention window. Assignments are kept
    /// for the experiment's lifetime; they leave with the experiment.
    pub fn purge_expired(&self, retention_days: i64) -> Result<u64, ExperimentError> {
        let cutoff = crate::events::retention_cutoff(retention_days);
        let removed = self
            .events
            .purge_older_than(cutoff)
            .map_err(|e| ExperimentError::Storage(e.to_string()))?;
        if removed > 0 {
            info!(removed, retention_days, "purged expired events");
        }
        Ok(removed)
    }

    fn with_experiment_mut<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Experiment) -> Result<T, ExperimentError>,
    ) -> Result<T, ExperimentError> {
        let mut experiments = self.experiments.write();
        let experiment = experiments
            .get_mut(&id)
            .ok_or_else(|| ExperimentError::TestNotFound(id.to_string()))?;
        f(experiment)
    }
}
