//! # Orders Types
//!
//! Domain types and port traits for the order sheet sync service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (OrderRecord, RawRow, reconciliation ops)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for the read-only API
//! - `error/` - Domain, normalization, source and repository error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    BatchSummary, OrderId, OrderOp, OrderRecord, OrderSnapshot, RawRow, ReconcileStrategy,
};
pub use dto::*;
pub use error::{AppError, DomainError, NormalizeError, RepoError, SourceError};
pub use ports::{OrderRepository, OrderSource};
