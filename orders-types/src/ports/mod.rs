//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod repository;
mod source;

pub use repository::OrderRepository;
pub use source::OrderSource;
