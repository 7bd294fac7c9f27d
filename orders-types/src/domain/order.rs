//! Order domain model.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

/// Fractional digits stored for prices (`numeric(15, 6)`).
pub const PRICE_SCALE: u32 = 6;

/// Largest absolute price that fits `numeric(15, 6)`.
const PRICE_LIMIT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Row identifier of an order (the sheet's first column).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct OrderId(i32);

impl OrderId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for OrderId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OrderId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A persisted order with its converted price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    /// External order reference, unique across all records
    pub order_number: i32,
    pub price_usd: Decimal,
    pub delivery_date: NaiveDate,
    pub price_rub: Decimal,
}

impl OrderRecord {
    /// Creates an order, rounding prices to the stored scale.
    ///
    /// # Validation
    /// - Prices must fit `numeric(15, 6)`
    pub fn new(
        id: OrderId,
        order_number: i32,
        price_usd: Decimal,
        delivery_date: NaiveDate,
        price_rub: Decimal,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            order_number,
            price_usd: checked_price("price_usd", price_usd)?,
            delivery_date,
            price_rub: checked_price("price_rub", price_rub)?,
        })
    }
}

fn checked_price(field: &'static str, value: Decimal) -> Result<Decimal, DomainError> {
    let value = value.round_dp(PRICE_SCALE);
    if value.abs() >= PRICE_LIMIT {
        return Err(DomainError::PriceOutOfRange { field, value });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_new_rounds_prices() {
        let order = OrderRecord::new(
            OrderId::new(1),
            1001,
            Decimal::from_str("1.1234567").unwrap(),
            date(),
            Decimal::from_str("2.0000001").unwrap(),
        )
        .unwrap();

        assert_eq!(order.price_usd, Decimal::from_str("1.123457").unwrap());
        assert_eq!(order.price_rub, Decimal::from_str("2").unwrap());
    }

    #[test]
    fn test_new_rejects_oversized_price() {
        let result = OrderRecord::new(
            OrderId::new(1),
            1001,
            Decimal::from(1_000_000_000i64),
            date(),
            Decimal::ONE,
        );

        assert!(matches!(
            result,
            Err(DomainError::PriceOutOfRange { field: "price_usd", .. })
        ));
    }

    #[test]
    fn test_order_id_parse() {
        assert_eq!(" 42 ".parse::<OrderId>().unwrap(), OrderId::new(42));
        assert!("4.2".parse::<OrderId>().is_err());
    }
}
