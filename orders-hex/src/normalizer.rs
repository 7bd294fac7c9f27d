//! Sheet row normalization.

use std::str::FromStr;

use chrono::NaiveDate;
use exchange_rates::{RateTable, USD_RATE_ID, convert};
use orders_types::domain::row::{
    DELIVERY_DATE_COLUMN, ID_COLUMN, ORDER_NUMBER_COLUMN, PRICE_COLUMN,
};
use orders_types::{NormalizeError, OrderId, OrderRecord, RawRow};
use rust_decimal::Decimal;

/// Date format used in the sheet (`01.03.2024`).
pub const SHEET_DATE_FORMAT: &str = "%d.%m.%Y";

/// Turns raw sheet rows into orders priced in roubles.
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    rate_id: String,
}

impl Default for RowNormalizer {
    fn default() -> Self {
        Self::new(USD_RATE_ID)
    }
}

impl RowNormalizer {
    /// Creates a normalizer converting with the rate stored under `rate_id`.
    pub fn new(rate_id: impl Into<String>) -> Self {
        Self {
            rate_id: rate_id.into(),
        }
    }

    pub fn rate_id(&self) -> &str {
        &self.rate_id
    }

    /// Parses one row, stopping at the first field that fails.
    pub fn normalize(&self, row: &RawRow, rates: &RateTable) -> Result<OrderRecord, NormalizeError> {
        let id: OrderId = field(row, ID_COLUMN, "id")?
            .parse()
            .map_err(|_| NormalizeError::InvalidId(row_text(row, ID_COLUMN)))?;

        let order_number: i32 = field(row, ORDER_NUMBER_COLUMN, "order_number")?
            .parse()
            .map_err(|_| NormalizeError::InvalidOrderNumber(row_text(row, ORDER_NUMBER_COLUMN)))?;

        let price_usd = Decimal::from_str(field(row, PRICE_COLUMN, "price_usd")?)
            .map_err(|_| NormalizeError::InvalidPrice(row_text(row, PRICE_COLUMN)))?;

        let delivery_date = NaiveDate::parse_from_str(
            field(row, DELIVERY_DATE_COLUMN, "delivery_date")?,
            SHEET_DATE_FORMAT,
        )
        .map_err(|_| NormalizeError::InvalidDate(row_text(row, DELIVERY_DATE_COLUMN)))?;

        let price_rub = convert(price_usd, rates, &self.rate_id)
            .ok_or_else(|| NormalizeError::RateUnavailable(self.rate_id.clone()))?;

        Ok(OrderRecord::new(
            id,
            order_number,
            price_usd,
            delivery_date,
            price_rub,
        )?)
    }

    /// Normalizes every row against the same rate table, keeping sheet order.
    pub fn normalize_all(
        &self,
        rows: &[RawRow],
        rates: &RateTable,
    ) -> Vec<Result<OrderRecord, NormalizeError>> {
        rows.iter().map(|row| self.normalize(row, rates)).collect()
    }
}

fn field<'a>(row: &'a RawRow, index: usize, name: &'static str) -> Result<&'a str, NormalizeError> {
    row.field(index)
        .map(str::trim)
        .ok_or(NormalizeError::MissingField(name))
}

fn row_text(row: &RawRow, index: usize) -> String {
    row.field(index).unwrap_or_default().to_string()
}
