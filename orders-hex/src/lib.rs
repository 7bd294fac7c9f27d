//! # Orders Hex
//!
//! Reconciliation loop and HTTP adapter for the order sync service.
//!
//! ## Architecture
//!
//! - `normalizer` - Sheet row parsing and price conversion
//! - `reconciler` - Insert/update/delete planning and atomic commit
//! - `poller` - The fetch → normalize → reconcile → sleep loop
//! - `service` - Read-only application service for the web view
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Everything is generic over the port traits from `orders-types`, allowing
//! different adapters to be injected.

pub mod error;
pub mod inbound;
pub mod normalizer;
pub mod openapi;
pub mod poller;
pub mod reconciler;
pub mod retry;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use error::SyncError;
pub use normalizer::RowNormalizer;
pub use poller::{Poller, PollerConfig};
pub use reconciler::{Plan, Reconciler};
pub use retry::RetryPolicy;
pub use service::OrderService;
