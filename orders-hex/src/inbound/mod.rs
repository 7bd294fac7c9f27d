//! HTTP Inbound Adapter
//!
//! Axum-based read-only view over the synchronized orders.

mod handlers;
mod rate_limit;
mod server;

pub use rate_limit::RateLimiterState;
pub use server::{HttpServer, shutdown_signal};
