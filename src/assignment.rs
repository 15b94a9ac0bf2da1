//! Durable visitor-to-variant assignments and the store contract behind
//! them.
//!
//! An assignment is written once on a visitor's first bucketing request and
//! never changes. Exactly-once semantics under concurrent first requests
//! rest entirely on the store's uniqueness constraint over
//! `(experiment_id, visitor_id)`: the protocol in
//! [`crate::manager::ExperimentManager::resolve_assignment`] inserts
//! optimistically and re-reads on conflict instead of locking.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::experiment::Variant;

/// A durable fact binding one visitor to one variant within one experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub visitor_id: String,
    pub created_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(experiment_id: Uuid, variant_id: Uuid, visitor_id: impl Into<String>) -> Self {
        Self {
            experiment_id,
            variant_id,
            visitor_id: visitor_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Store-level failures, with uniqueness conflicts kept distinguishable
/// from everything else. A conflict on insert is an expected outcome of
/// the assignment race; any other error is fatal for the operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("uniqueness constraint violated")]
    Conflict,

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Persistence contract the assignment protocol needs: point lookup plus
/// insert guarded by a uniqueness constraint on `(experiment_id,
/// visitor_id)` that reports conflicts distinctly.
pub trait AssignmentStore: Send + Sync {
    fn find(&self, experiment_id: Uuid, visitor_id: &str)
        -> Result<Option<Assignment>, StoreError>;

    /// Insert a new assignment. Returns [`StoreError::Conflict`] when an
    /// assignment for the same `(experiment_id, visitor_id)` already
    /// exists.
    fn insert(&self, assignment: Assignment) -> Result<(), StoreError>;

    /// Visitors assigned to the given variant.
    fn count_for_variant(&self, experiment_id: Uuid, variant_id: Uuid)
        -> Result<u64, StoreError>;

    /// Drop all assignments for an experiment (cascade delete / retention).
    fn remove_experiment(&self, experiment_id: Uuid) -> Result<u64, StoreError>;
}

/// In-memory reference store. The concurrent map's entry API plays the role
/// a relational unique index plays in production: insert-if-absent is
/// atomic, and a losing writer observes a conflict rather than silently
/// overwriting the winner.
#[derive(Default)]
pub struct InMemoryAssignmentStore {
    assignments: DashMap<(Uuid, String), Assignment>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn find(
        &self,
        experiment_id: Uuid,
        visitor_id: &str,
    ) -> Result<Option<Assignment>, StoreError> {
        Ok(self
            .assignments
            .get(&(experiment_id, visitor_id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn insert(&self, assignment: Assignment) -> Result<(), StoreError> {
        let key = (assignment.experiment_id, assignment.visitor_id.clone());
        match self.assignments.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(StoreError::Conflict),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(assignment);
                Ok(())
            }
        }
    }

    fn count_for_variant(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<u64, StoreError> {
        Ok(self
            .assignments
            .iter()
            .filter(|entry| {
                entry.key().0 == experiment_id && entry.value().variant_id == variant_id
            })
            .count() as u64)
    }

    fn remove_experiment(&self, experiment_id: Uuid) -> Result<u64, StoreError> {
        let before = self.assignments.len();
        self.assignments.retain(|key, _| key.0 != experiment_id);
        Ok((before - self.assignments.len()) as u64)
    }
}

/// Weighted selection: given a draw uniform over `[0, total_weight)`, walk
/// the variants accumulating weight and take the first whose cumulative
/// weight meets or exceeds the draw.
///
/// The `draw <= cumulative` comparison means a zero-weight variant is
/// selectable only when the draw lands exactly on its cumulative boundary,
/// and the final variant is always reachable even if floating-point
/// accumulation falls a hair short of the total.
pub fn pick_weighted(variants: &[Variant], draw: f64) -> &Variant {
    let mut cumulative = 0.0;
    for variant in variants {
        cumulative += variant.weight as f64;
        if draw <= cumulative {
            return variant;
        }
    }
    // Unreachable for draws inside [0, total), but the contract promises
    // the last variant rather than a panic.
    variants
        .last()
        .expect("pick_weighted requires at least one variant")
}

/// Sum of variant weights as the draw's upper bound.
pub fn total_weight(variants: &[Variant]) -> f64 {
    variants.iter().map(|v| v.weight as f64).sum()
}
