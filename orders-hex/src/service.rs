//! Order Application Service
//!
//! Read-only queries behind the web view. Writes only ever happen through
//! the [`Poller`](crate::Poller).

use orders_types::{AppError, OrderRecord, OrderRepository};

/// Application service for the order view.
///
/// Generic over `R: OrderRepository` - the adapter is injected at compile time.
pub struct OrderService<R: OrderRepository> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    /// Creates a new order service with the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Lists all orders ordered by id.
    pub async fn list_orders(&self) -> Result<Vec<OrderRecord>, AppError> {
        self.repo.list_orders().await.map_err(Into::into)
    }
}
