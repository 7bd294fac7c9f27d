//! Domain models for the order sync service.

pub mod order;
pub mod reconcile;
pub mod row;

pub use order::{OrderId, OrderRecord};
pub use reconcile::{BatchSummary, OrderOp, OrderSnapshot, ReconcileStrategy};
pub use row::RawRow;
