//! Append-only funnel events and their aggregation into per-variant stats.
//!
//! Events are never updated; purchases carry an order id that the store
//! deduplicates system-wide so a redelivered order-paid notification cannot
//! attribute revenue twice.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assignment::StoreError;

/// Funnel step a visitor took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    View,
    AddToCart,
    Purchase,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::AddToCart => "add_to_cart",
            Self::Purchase => "purchase",
        }
    }
}

/// One recorded fact of visitor behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub visitor_id: String,
    pub kind: EventKind,
    pub product_id: Option<String>,
    /// Present on purchase events; the idempotency key
    pub order_id: Option<String>,
    /// Order revenue in minor currency units
    pub revenue_cents: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an append: recorded, or dropped as a duplicate purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Recorded,
    DuplicatePurchase,
}

/// Persistence contract for events: append with purchase dedup on
/// `(order_id, kind)`, plus the aggregate reads the statistics engine
/// consumes.
pub trait EventStore: Send + Sync {
    /// Append an event. Purchase events whose order id was already
    /// recorded are reported as duplicates, not stored again.
    fn append(&self, event: Event) -> Result<AppendOutcome, StoreError>;

    /// Conversion and revenue totals for one variant. Visitor counts come
    /// from the assignment store, not from here.
    fn purchase_totals(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<(u64, u64), StoreError>;

    /// Per-order revenue amounts for one variant, in cents. Feeds the
    /// high-fidelity variance path of the revenue test.
    fn revenue_samples(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Vec<f64>, StoreError>;

    /// Event count per kind for one variant, for funnel reporting.
    fn kind_counts(&self, experiment_id: Uuid, variant_id: Uuid)
        -> Result<(u64, u64, u64), StoreError>;

    /// Drop all events for an experiment (cascade delete).
    fn remove_experiment(&self, experiment_id: Uuid) -> Result<u64, StoreError>;

    /// Drop events older than the cutoff; returns how many were removed.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// In-memory reference store. The purchase-dedup map stands in for the
/// relational uniqueness constraint on `(order_id, kind = purchase)`.
#[derive(Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<Event>>,
    purchased_orders: DashMap<String, Uuid>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, event: Event) -> Result<AppendOutcome, StoreError> {
        if event.kind == EventKind::Purchase {
            if let Some(order_id) = &event.order_id {
                match self.purchased_orders.entry(order_id.clone()) {
                    dashmap::mapref::entry::Entry::Occupied(_) => {
                        return Ok(AppendOutcome::DuplicatePurchase);
                    }
                    dashmap::mapref::entry::Entry::Vacant(slot) => {
                        slot.insert(event.experiment_id);
                    }
                }
            }
        }
        self.events.write().push(event);
        Ok(AppendOutcome::Recorded)
    }

    fn purchase_totals(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<(u64, u64), StoreError> {
        let events = self.events.read();
        let mut conversions = 0u64;
        let mut revenue = 0u64;
        for event in events.iter() {
            if event.experiment_id == experiment_id
                && event.variant_id == variant_id
                && event.kind == EventKind::Purchase
            {
                conversions += 1;
                revenue += event.revenue_cents.unwrap_or(0);
            }
        }
        Ok((conversions, revenue))
    }

    fn revenue_samples(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<Vec<f64>, StoreError> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| {
                e.experiment_id == experiment_id
                    && e.variant_id == variant_id
                    && e.kind == EventKind::Purchase
            })
            .filter_map(|e| e.revenue_cents)
            .map(|cents| cents as f64)
            .collect())
    }

    fn kind_counts(
        &self,
        experiment_id: Uuid,
        variant_id: Uuid,
    ) -> Result<(u64, u64, u64), StoreError> {
        let events = self.events.read();
        let mut views = 0u64;
        let mut carts = 0u64;
        let mut purchases = 0u64;
        for event in events.iter() {
            if event.experiment_id != experiment_id || event.variant_id != variant_id {
                continue;
            }
            match event.kind {
                EventKind::View => views += 1,
                EventKind::AddToCart => carts += 1,
                EventKind::Purchase => purchases += 1,
            }
        }
        Ok((views, carts, purchases))
    }

    fn remove_experiment(&self, experiment_id: Uuid) -> Result<u64, StoreError> {
        let mut events = self.events.write();
        let before = events.len();
        events.retain(|e| e.experiment_id != experiment_id);
        self.purchased_orders
            .retain(|_, exp| *exp != experiment_id);
        Ok((before - events.len()) as u64)
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut events = self.events.write();
        let before = events.len();
        events.retain(|e| e.created_at >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

/// Retention cutoff helper: now minus the configured window.
pub fn retention_cutoff(retention_days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(retention_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase(exp: Uuid, variant: Uuid, order: &str, cents: u64) -> Event {
        Event {
            experiment_id: exp,
            variant_id: variant,
            visitor_id: "visitor-1".to_string(),
            kind: EventKind::Purchase,
            product_id: None,
            order_id: Some(order.to_string()),
            revenue_cents: Some(cents),
            created_at: Utc::now(),
        }
    }

    fn view(exp: Uuid, variant: Uuid) -> Event {
        Event {
            experiment_id: exp,
            variant_id: variant,
            visitor_id: "visitor-1".to_string(),
            kind: EventKind::View,
            product_id: Some("prod_1".to_string()),
            order_id: None,
            revenue_cents: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_purchase_is_a_noop() {
        let store = InMemoryEventStore::new();
        let exp = Uuid::new_v4();
        let variant = Uuid::new_v4();

        assert_eq!(
            store.append(purchase(exp, variant, "order-1", 2599)).unwrap(),
            AppendOutcome::Recorded
        );
        assert_eq!(
            store.append(purchase(exp, variant, "order-1", 2599)).unwrap(),
            AppendOutcome::DuplicatePurchase
        );

        let (conversions, revenue) = store.purchase_totals(exp, variant).unwrap();
        assert_eq!(conversions, 1);
        assert_eq!(revenue, 2599);
    }

    #[test]
    fn totals_are_scoped_to_variant() {
        let store = InMemoryEventStore::new();
        let exp = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.append(purchase(exp, a, "order-1", 1000)).unwrap();
        store.append(purchase(exp, b, "order-2", 5000)).unwrap();
        store.append(view(exp, a)).unwrap();

        assert_eq!(store.purchase_totals(exp, a).unwrap(), (1, 1000));
        assert_eq!(store.purchase_totals(exp, b).unwrap(), (1, 5000));
        assert_eq!(store.kind_counts(exp, a).unwrap(), (1, 0, 1));
    }

    #[test]
    fn revenue_samples_track_orders() {
        let store = InMemoryEventStore::new();
        let exp = Uuid::new_v4();
        let variant = Uuid::new_v4();

        store.append(purchase(exp, variant, "o1", 1000)).unwrap();
        store.append(purchase(exp, variant, "o2", 3000)).unwrap();

        let samples = store.revenue_samples(exp, variant).unwrap();
        assert_eq!(samples, vec![1000.0, 3000.0]);
    }

    #[test]
    fn purge_respects_cutoff() {
        let store = InMemoryEventStore::new();
        let exp = Uuid::new_v4();
        let variant = Uuid::new_v4();

        let mut old = view(exp, variant);
        old.created_at = Utc::now() - Duration::days(120);
        store.append(old).unwrap();
        store.append(view(exp, variant)).unwrap();

        let removed = store.purge_older_than(retention_cutoff(90)).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.kind_counts(exp, variant).unwrap().0, 1);
    }

    #[test]
    fn cascade_removal_clears_order_index() {
        let store = InMemoryEventStore::new();
        let exp = Uuid::new_v4();
        let variant = Uuid::new_v4();
        store.append(purchase(exp, variant, "order-1", 100)).unwrap();

        store.remove_experiment(exp).unwrap();

        // Same order id is acceptable again once the experiment is gone
        assert_eq!(
            store.append(purchase(exp, variant, "order-1", 100)).unwrap(),
            AppendOutcome::Recorded
        );
    }
}
