//! Data Transfer Objects (DTOs) for the read-only order API.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{OrderId, OrderRecord};

/// One order as listed by the web view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: OrderId,
    #[schema(example = 1001)]
    pub order_number: i32,
    /// Price in US dollars
    #[schema(value_type = String, example = "19.990000")]
    pub price_usd: Decimal,
    #[schema(example = "2024-03-01")]
    pub delivery_date: NaiveDate,
    /// Price in roubles at the CBR rate of the sync day
    #[schema(value_type = String, example = "1801.566766")]
    pub price_rub: Decimal,
}

impl From<OrderRecord> for OrderResponse {
    fn from(order: OrderRecord) -> Self {
        Self {
            id: order.id,
            order_number: order.order_number,
            price_usd: order.price_usd,
            delivery_date: order.delivery_date,
            price_rub: order.price_rub,
        }
    }
}
