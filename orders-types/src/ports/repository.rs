//! Repository port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory mocks) implement this trait.

use crate::domain::{OrderOp, OrderRecord, OrderSnapshot};
use crate::error::RepoError;

/// The repository port for the `orders` table.
///
/// `apply_batch` MUST be atomic: either every operation of the batch is
/// committed or none is.
#[async_trait::async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    /// Creates the `orders` table if it does not exist.
    async fn ensure_schema(&self) -> Result<(), RepoError>;

    /// Reads the persisted ids and record count.
    async fn snapshot(&self) -> Result<OrderSnapshot, RepoError>;

    /// Applies all operations of one cycle in a single transaction.
    async fn apply_batch(&self, ops: &[OrderOp]) -> Result<(), RepoError>;

    /// Lists all orders ordered by id.
    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError>;
}

#[async_trait::async_trait]
impl<R: OrderRepository> OrderRepository for std::sync::Arc<R> {
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        (**self).ensure_schema().await
    }

    async fn snapshot(&self) -> Result<OrderSnapshot, RepoError> {
        (**self).snapshot().await
    }

    async fn apply_batch(&self, ops: &[OrderOp]) -> Result<(), RepoError> {
        (**self).apply_batch(ops).await
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError> {
        (**self).list_orders().await
    }
}
