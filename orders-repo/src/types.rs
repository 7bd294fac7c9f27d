//! Shared database row types and error mapping.

use sqlx::FromRow;

use orders_types::{OrderId, OrderRecord, RepoError};

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Classifies a driver error into the repository taxonomy.
pub fn db_error(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => RepoError::Connection(err.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(db.message().to_string())
        }
        _ => RepoError::Database(err.to_string()),
    }
}

/// Like [`db_error`], but reports non-connection failures as transaction errors.
pub fn tx_error(err: sqlx::Error) -> RepoError {
    match db_error(err) {
        RepoError::Database(msg) => RepoError::Transaction(msg),
        other => other,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Order row from PostgreSQL (`numeric` and `date` decode natively).
#[cfg(feature = "postgres")]
#[derive(FromRow)]
pub struct PgOrderRow {
    pub id: i32,
    pub order_number: i32,
    pub price_usd: rust_decimal::Decimal,
    pub delivery_date: chrono::NaiveDate,
    pub price_rub: rust_decimal::Decimal,
}

#[cfg(feature = "postgres")]
impl PgOrderRow {
    pub fn into_domain(self) -> OrderRecord {
        OrderRecord {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            price_usd: self.price_usd,
            delivery_date: self.delivery_date,
            price_rub: self.price_rub,
        }
    }
}

/// Order row from SQLite, where decimals and dates are stored as text.
#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct SqliteOrderRow {
    pub id: i32,
    pub order_number: i32,
    pub price_usd: String,
    pub delivery_date: String,
    pub price_rub: String,
}

#[cfg(feature = "sqlite")]
impl SqliteOrderRow {
    pub fn into_domain(self) -> Result<OrderRecord, RepoError> {
        Ok(OrderRecord {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            price_usd: parse_decimal(&self.price_usd)?,
            delivery_date: parse_date(&self.delivery_date)?,
            price_rub: parse_decimal(&self.price_rub)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Storage format for dates kept as text.
#[cfg(feature = "sqlite")]
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[cfg(feature = "sqlite")]
pub fn parse_decimal(s: &str) -> Result<rust_decimal::Decimal, RepoError> {
    s.parse()
        .map_err(|e| RepoError::Database(format!("Invalid decimal {:?}: {}", s, e)))
}

#[cfg(feature = "sqlite")]
pub fn parse_date(s: &str) -> Result<chrono::NaiveDate, RepoError> {
    chrono::NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| RepoError::Database(format!("Invalid date {:?}: {}", s, e)))
}
