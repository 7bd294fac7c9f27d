//! Batch reconciliation.
//!
//! Planning is pure: it turns the normalized rows of one cycle and the
//! persisted [`OrderSnapshot`] into a list of [`OrderOp`]s. Committing hands
//! that list to the repository, which applies it in one transaction.

use std::collections::BTreeSet;

use orders_types::{
    BatchSummary, NormalizeError, OrderId, OrderOp, OrderRecord, OrderRepository, OrderSnapshot,
    ReconcileStrategy, RepoError,
};
use tracing::{debug, info, instrument, warn};

/// Operations planned for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub ops: Vec<OrderOp>,
    pub summary: BatchSummary,
}

/// Plans and commits the writes for a batch of normalized rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    strategy: ReconcileStrategy,
}

impl Reconciler {
    pub fn new(strategy: ReconcileStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ReconcileStrategy {
        self.strategy
    }

    /// Plans the operations for `outcomes`, given in sheet order.
    ///
    /// A cursor holds the id of the last row that normalized successfully.
    /// A malformed row deletes the order under the cursor and leaves the
    /// cursor where it is, so consecutive malformed rows delete it once.
    /// A row whose rate is missing is skipped without touching the cursor.
    pub fn plan<I>(&self, outcomes: I, snapshot: &OrderSnapshot) -> Plan
    where
        I: IntoIterator<Item = Result<OrderRecord, NormalizeError>>,
    {
        let mut plan = Plan::default();
        let mut known: BTreeSet<OrderId> = snapshot.ids.clone();
        let mut cursor: Option<OrderId> = None;
        let mut last_deleted: Option<OrderId> = None;

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(order) => {
                    cursor = Some(order.id);
                    last_deleted = None;
                    self.plan_valid(order, snapshot, &mut known, &mut plan);
                }
                Err(err) if err.is_row_invalid() => {
                    plan.summary.invalid += 1;
                    warn!(row = index, error = %err, stale_id = ?cursor, "Invalid row");

                    if let Some(id) = cursor {
                        if last_deleted != Some(id) {
                            known.remove(&id);
                            plan.ops.push(OrderOp::Delete(id));
                            plan.summary.deleted += 1;
                            last_deleted = Some(id);
                        }
                    }
                }
                Err(err) => {
                    plan.summary.skipped += 1;
                    warn!(row = index, error = %err, "Skipping row without a rate");
                }
            }
        }

        plan
    }

    fn plan_valid(
        &self,
        order: OrderRecord,
        snapshot: &OrderSnapshot,
        known: &mut BTreeSet<OrderId>,
        plan: &mut Plan,
    ) {
        match self.strategy {
            ReconcileStrategy::Upsert => {
                plan.ops.push(OrderOp::Upsert(order));
                plan.summary.upserted += 1;
            }
            ReconcileStrategy::Legacy => {
                let id = order.id;
                if known.contains(&id) {
                    plan.ops.push(OrderOp::Update(order));
                    plan.summary.updated += 1;
                } else if i64::from(id.get()) > snapshot.count {
                    known.insert(id);
                    plan.ops.push(OrderOp::Insert(order));
                    plan.summary.inserted += 1;
                } else {
                    debug!(%id, count = snapshot.count, "Leaving id gap untouched");
                    plan.summary.skipped += 1;
                }
            }
        }
    }

    /// Reads the snapshot, plans, and applies the whole plan atomically.
    #[instrument(skip(self, repo, outcomes), fields(strategy = %self.strategy))]
    pub async fn reconcile<R, I>(&self, repo: &R, outcomes: I) -> Result<BatchSummary, RepoError>
    where
        R: OrderRepository + ?Sized,
        I: IntoIterator<Item = Result<OrderRecord, NormalizeError>>,
    {
        let snapshot = repo.snapshot().await?;
        let plan = self.plan(outcomes, &snapshot);

        if !plan.ops.is_empty() {
            if let Err(e) = repo.apply_batch(&plan.ops).await {
                if let (RepoError::Conflict(detail), ReconcileStrategy::Legacy) =
                    (&e, self.strategy)
                {
                    // Swapped order numbers collide statement by statement
                    let ids: Vec<OrderId> = plan
                        .ops
                        .iter()
                        .filter_map(|op| match op {
                            OrderOp::Insert(o) | OrderOp::Update(o) => Some(o.id),
                            _ => None,
                        })
                        .collect();
                    warn!(
                        ?ids,
                        %detail,
                        "Order number collision under legacy strategy; batch rejected until the sheet changes"
                    );
                }
                return Err(e);
            }
        }

        info!(summary = %plan.summary, "Batch reconciled");
        Ok(plan.summary)
    }
}
