//! Row source port.
//!
//! Implemented by the spreadsheet client; tests plug in fixed row lists.

use crate::domain::RawRow;
use crate::error::SourceError;

/// Port trait for the external table of order rows.
#[async_trait::async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetches every currently visible row, in sheet order.
    ///
    /// Returns an empty list when the range holds no data.
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError>;
}
