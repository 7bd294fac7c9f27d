//! PostgreSQL repository adapter.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use orders_types::{OrderId, OrderOp, OrderRecord, OrderRepository, OrderSnapshot, RepoError};

use crate::DatabaseSettings;
use crate::types::{PgOrderRow, db_error, tx_error};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository; every batch runs in one transaction.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), RepoError> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt).execute(pool).await.map_err(|e| match db_error(e) {
                RepoError::Database(msg) => {
                    RepoError::Database(format!("Migration {} failed: {}", name, msg))
                }
                other => other,
            })?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), RepoError> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_orders_pg.sql"),
        "0001",
    )
    .await
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
}

impl PostgresRepo {
    /// Creates a lazily connecting repository from a URL.
    pub fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = pool_options().connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    /// Creates a lazily connecting repository from connection parts.
    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.name);
        Self {
            pool: pool_options().connect_lazy_with(options),
        }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn apply_op(db_tx: &mut Transaction<'_, Postgres>, op: &OrderOp) -> Result<(), RepoError> {
    match op {
        OrderOp::Insert(order) => {
            sqlx::query(
                r#"INSERT INTO orders (id, order_number, price_usd, delivery_date, price_rub)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(order.id.get())
            .bind(order.order_number)
            .bind(order.price_usd)
            .bind(order.delivery_date)
            .bind(order.price_rub)
            .execute(&mut **db_tx)
            .await
            .map_err(tx_error)?;
        }
        OrderOp::Update(order) => {
            sqlx::query(
                r#"UPDATE orders
                   SET order_number = $1, price_usd = $2, delivery_date = $3, price_rub = $4
                   WHERE id = $5"#,
            )
            .bind(order.order_number)
            .bind(order.price_usd)
            .bind(order.delivery_date)
            .bind(order.price_rub)
            .bind(order.id.get())
            .execute(&mut **db_tx)
            .await
            .map_err(tx_error)?;
        }
        OrderOp::Upsert(order) => {
            // Free the id if it currently belongs to another order number
            sqlx::query(r#"DELETE FROM orders WHERE id = $1 AND order_number <> $2"#)
                .bind(order.id.get())
                .bind(order.order_number)
                .execute(&mut **db_tx)
                .await
                .map_err(tx_error)?;

            sqlx::query(
                r#"INSERT INTO orders (id, order_number, price_usd, delivery_date, price_rub)
                   VALUES ($1, $2, $3, $4, $5)
                   ON CONFLICT (order_number) DO UPDATE
                   SET id = EXCLUDED.id,
                       price_usd = EXCLUDED.price_usd,
                       delivery_date = EXCLUDED.delivery_date,
                       price_rub = EXCLUDED.price_rub"#,
            )
            .bind(order.id.get())
            .bind(order.order_number)
            .bind(order.price_usd)
            .bind(order.delivery_date)
            .bind(order.price_rub)
            .execute(&mut **db_tx)
            .await
            .map_err(tx_error)?;
        }
        OrderOp::Delete(id) => {
            sqlx::query(r#"DELETE FROM orders WHERE id = $1"#)
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
impl OrderRepository for PostgresRepo {
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool).await
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
            // Dropping the transaction on error rolls the whole batch back
            apply_op(&mut db_tx, op).await?;
        }

        db_tx.commit().await.map_err(tx_error)?;
        debug!(ops = ops.len(), "Committed order batch");
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError> {
        let rows: Vec<PgOrderRow> = sqlx::query_as(
            r#"SELECT id, order_number, price_usd, delivery_date, price_rub FROM orders ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(PgOrderRow::into_domain).collect())
    }
}
