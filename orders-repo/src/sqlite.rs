//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::debug;

use orders_types::{OrderId, OrderOp, OrderRecord, OrderRepository, OrderSnapshot, RepoError};

use crate::types::{DATE_FORMAT, SqliteOrderRow, db_error, tx_error};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

impl SqliteRepo {
    /// Creates a new SQLite repository.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives and dies with its single connection
        let pool = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn insert_order(
    db_tx: &mut Transaction<'_, Sqlite>,
    order: &OrderRecord,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"INSERT INTO orders (id, order_number, price_usd, delivery_date, price_rub)
           VALUES (?, ?, ?, ?, ?)"#,
    )
    .bind(order.id.get())
    .bind(order.order_number)
    .bind(order.price_usd.to_string())
    .bind(order.delivery_date.format(DATE_FORMAT).to_string())
    .bind(order.price_rub.to_string())
    .execute(&mut **db_tx)
    .await
    .map_err(tx_error)?;
    Ok(())
}

/// Moves the row holding `order.order_number` to `order.id` and overwrites
/// its values. Returns false when no row holds that order number.
async fn update_by_order_number(
    db_tx: &mut Transaction<'_, Sqlite>,
    order: &OrderRecord,
) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"UPDATE orders
           SET id = ?, price_usd = ?, delivery_date = ?, price_rub = ?
           WHERE order_number = ?"#,
    )
    .bind(order.id.get())
    .bind(order.price_usd.to_string())
    .bind(order.delivery_date.format(DATE_FORMAT).to_string())
    .bind(order.price_rub.to_string())
    .bind(order.order_number)
    .execute(&mut **db_tx)
    .await
    .map_err(tx_error)?;
    Ok(result.rows_affected() > 0)
}

async fn apply_op(db_tx: &mut Transaction<'_, Sqlite>, op: &OrderOp) -> Result<(), RepoError> {
    match op {
        OrderOp::Insert(order) => insert_order(db_tx, order).await?,
        OrderOp::Update(order) => {
            sqlx::query(
                r#"UPDATE orders
                   SET order_number = ?, price_usd = ?, delivery_date = ?, price_rub = ?
                   WHERE id = ?"#,
            )
            .bind(order.order_number)
            .bind(order.price_usd.to_string())
            .bind(order.delivery_date.format(DATE_FORMAT).to_string())
            .bind(order.price_rub.to_string())
            .bind(order.id.get())
            .execute(&mut **db_tx)
            .await
            .map_err(tx_error)?;
        }
        OrderOp::Upsert(order) => {
            // Free the id if it currently belongs to another order number
            sqlx::query(r#"DELETE FROM orders WHERE id = ? AND order_number <> ?"#)
                .bind(order.id.get())
                .bind(order.order_number)
                .execute(&mut **db_tx)
                .await
                .map_err(tx_error)?;

            // Same effect as ON CONFLICT (order_number) DO UPDATE, without
            // relying on how SQLite orders the primary key check
            if !update_by_order_number(db_tx, order).await? {
                insert_order(db_tx, order).await?;
            }
        }
        OrderOp::Delete(id) => {
            sqlx::query(r#"DELETE FROM orders WHERE id = ?"#)
                .bind(id.get())
                .execute(&mut **db_tx)
                .await
                .map_err(tx_error)?;
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl OrderRepository for SqliteRepo {
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_orders.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<OrderSnapshot, RepoError> {
        let ids: Vec<i32> = sqlx::query_scalar(r#"SELECT id FROM orders"#)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(OrderSnapshot::new(ids.into_iter().map(OrderId::new)))
    }

    async fn apply_batch(&self, ops: &[OrderOp]) -> Result<(), RepoError> {
        let mut db_tx = self.pool.begin().await.map_err(tx_error)?;

        for op in ops {
            apply_op(&mut db_tx, op).await?;
        }

        db_tx.commit().await.map_err(tx_error)?;
        debug!(ops = ops.len(), "Committed order batch");
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError> {
        let rows: Vec<SqliteOrderRow> = sqlx::query_as(
            r#"SELECT id, order_number, price_usd, delivery_date, price_rub FROM orders ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(SqliteOrderRow::into_domain).collect()
    }
}
