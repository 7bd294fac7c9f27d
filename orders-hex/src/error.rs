//! Reconciliation cycle errors.

use exchange_rates::ExchangeError;
use orders_types::{RepoError, SourceError};

/// Why a reconciliation cycle did not commit.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Row source failed: {0}")]
    Source(#[from] SourceError),

    #[error("Rate table unavailable: {0}")]
    Rates(#[from] ExchangeError),

    #[error("Storage failed: {0}")]
    Storage(#[from] RepoError),
}

impl SyncError {
    /// Fatal errors end the polling loop; everything else abandons one cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Source(e) if e.is_fatal())
    }
}
