//! Daily Exchange Rate Tables
//!
//! This library fetches the Central Bank of Russia daily rate table, keeps it
//! in a fixed-window cache and converts prices into roubles.
//!
//! # Example
//! ```ignore
//! use exchange_rates::{CbrClient, DEFAULT_CACHE_WINDOW, RateCache, USD_RATE_ID, convert};
//!
//! let cache = RateCache::new(CbrClient::new("https://www.cbr.ru"), DEFAULT_CACHE_WINDOW);
//! let table = cache.get_rate(chrono::Utc::now()).await?;
//! let rub = convert(price_usd, &table, USD_RATE_ID);
//! ```

mod cache;
mod cbr;
mod table;

pub use cache::{DEFAULT_CACHE_WINDOW, RateCache, moscow_date};
pub use cbr::CbrClient;
pub use table::{RateTable, USD_RATE_ID, convert};

use chrono::NaiveDate;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for exchange rate operations.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Rate service returned HTTP {0}")]
    Status(u16),

    #[error("Malformed rate table: {0}")]
    Parse(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Source port
// ─────────────────────────────────────────────────────────────────────────────

/// Port trait for daily rate table sources.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch the rate table published for `date`.
    async fn fetch_rates(&self, date: NaiveDate) -> Result<RateTable, ExchangeError>;
}

#[async_trait::async_trait]
impl<S: RateSource + ?Sized> RateSource for std::sync::Arc<S> {
    async fn fetch_rates(&self, date: NaiveDate) -> Result<RateTable, ExchangeError> {
        (**self).fetch_rates(date).await
    }
}
