//! Reconciliation vocabulary shared by the planner and the repositories.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::order::{OrderId, OrderRecord};

/// How valid rows are merged into persisted storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcileStrategy {
    /// Insert or update keyed on the unique order number.
    #[default]
    Upsert,
    /// Id/count heuristic: insert ids beyond the persisted count, update
    /// existing ids, leave gaps alone.
    Legacy,
}

impl fmt::Display for ReconcileStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStrategy::Upsert => f.write_str("upsert"),
            ReconcileStrategy::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for ReconcileStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upsert" => Ok(ReconcileStrategy::Upsert),
            "legacy" => Ok(ReconcileStrategy::Legacy),
            other => Err(format!(
                "unknown reconcile strategy {other:?} (expected upsert or legacy)"
            )),
        }
    }
}

/// One planned write against the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOp {
    /// Insert a new row with an explicit id.
    Insert(OrderRecord),
    /// Overwrite order number, prices and date of an existing id.
    Update(OrderRecord),
    /// Insert, or update the row holding the same order number.
    Upsert(OrderRecord),
    /// Remove the row with this id, if any.
    Delete(OrderId),
}

/// Persisted state read at the start of a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSnapshot {
    pub ids: BTreeSet<OrderId>,
    pub count: i64,
}

impl OrderSnapshot {
    pub fn new(ids: impl IntoIterator<Item = OrderId>) -> Self {
        let ids: BTreeSet<OrderId> = ids.into_iter().collect();
        let count = ids.len() as i64;
        Self { ids, count }
    }

    pub fn contains(&self, id: OrderId) -> bool {
        self.ids.contains(&id)
    }
}

/// Outcome counters for one reconciliation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub inserted: usize,
    pub updated: usize,
    pub upserted: usize,
    pub deleted: usize,
    /// Valid rows left untouched (id gaps, missing rate)
    pub skipped: usize,
    /// Rows that failed to normalize
    pub invalid: usize,
}

impl BatchSummary {
    /// Number of write operations planned.
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.upserted + self.deleted
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted={} updated={} upserted={} deleted={} skipped={} invalid={}",
            self.inserted, self.updated, self.upserted, self.deleted, self.skipped, self.invalid
        )
    }
}
