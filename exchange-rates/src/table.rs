//! Rate table and conversion.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// CBR identifier of the US dollar entry.
pub const USD_RATE_ID: &str = "R01235";

/// Fractional digits kept for converted prices.
const PRICE_SCALE: u32 = 6;

/// Per-unit rates for one calendar day, keyed by CBR currency id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    date: NaiveDate,
    rates: HashMap<String, Decimal>,
}

impl RateTable {
    /// Creates an empty table for the given date.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            rates: HashMap::new(),
        }
    }

    /// Adds or replaces a per-unit rate.
    pub fn with_rate(mut self, id: impl Into<String>, rate: Decimal) -> Self {
        self.insert(id, rate);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, rate: Decimal) {
        self.rates.insert(id.into(), rate);
    }

    /// Date the table was published for.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Roubles per one unit of the currency identified by `id`.
    pub fn rate(&self, id: &str) -> Option<Decimal> {
        self.rates.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Converts `price` with the rate stored under `id`.
///
/// Returns `None` when the table has no such entry.
pub fn convert(price: Decimal, table: &RateTable, id: &str) -> Option<Decimal> {
    table
        .rate(id)
        .map(|rate| (price * rate).round_dp(PRICE_SCALE))
}
