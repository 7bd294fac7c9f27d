//! Error types for the order sync service.

use rust_decimal::Decimal;

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("{field} {value} does not fit numeric(15,6)")]
    PriceOutOfRange { field: &'static str, value: Decimal },
}

/// Reasons a sheet row could not become an order.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Missing {0} column")]
    MissingField(&'static str),

    #[error("Invalid id: {0:?}")]
    InvalidId(String),

    #[error("Invalid order number: {0:?}")]
    InvalidOrderNumber(String),

    #[error("Invalid price: {0:?}")]
    InvalidPrice(String),

    #[error("Invalid delivery date: {0:?}")]
    InvalidDate(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("No rate for {0} in the current rate table")]
    RateUnavailable(String),
}

impl NormalizeError {
    /// True when the row itself is malformed, as opposed to a missing rate.
    pub fn is_row_invalid(&self) -> bool {
        !matches!(self, NormalizeError::RateUnavailable(_))
    }
}

/// Errors from the external row source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source authorization failed: {0}")]
    Unauthorized(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Source returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed source response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Authorization failures cannot be fixed by retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Unauthorized(_))
    }
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Connection(e) => AppError::Unavailable(e),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Transaction(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Internal(e),
        }
    }
}
