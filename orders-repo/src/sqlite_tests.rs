//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use orders_types::{OrderId, OrderOp, OrderRecord, OrderRepository, RepoError};
    use rust_decimal::Decimal;

    use crate::SqliteRepo;

    async fn setup_repo() -> SqliteRepo {
        let repo = SqliteRepo::new("sqlite::memory:").await.unwrap();
        repo.ensure_schema().await.unwrap();
        repo
    }

    fn order(id: i32, order_number: i32, price: &str) -> OrderRecord {
        let price_usd = Decimal::from_str(price).unwrap();
        OrderRecord {
            id: OrderId::new(id),
            order_number,
            price_usd,
            delivery_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            price_rub: price_usd * Decimal::from(90),
        }
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let repo = setup_repo().await;

        repo.ensure_schema().await.unwrap();

        assert!(repo.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_list_ordered_by_id() {
        let repo = setup_repo().await;

        repo.apply_batch(&[
            OrderOp::Insert(order(2, 1002, "5.5")),
            OrderOp::Insert(order(1, 1001, "19.99")),
        ])
        .await
        .unwrap();

        let orders = repo.list_orders().await.unwrap();

        assert_eq!(orders, vec![order(1, 1001, "19.99"), order(2, 1002, "5.5")]);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let repo = setup_repo().await;
        repo.apply_batch(&[
            OrderOp::Insert(order(1, 1001, "1")),
            OrderOp::Insert(order(4, 1004, "4")),
        ])
        .await
        .unwrap();

        let snapshot = repo.snapshot().await.unwrap();

        assert_eq!(snapshot.count, 2);
        assert!(snapshot.contains(OrderId::new(4)));
        assert!(!snapshot.contains(OrderId::new(2)));
    }

    #[tokio::test]
    async fn test_update_overwrites_all_fields() {
        let repo = setup_repo().await;
        repo.apply_batch(&[OrderOp::Insert(order(1, 1001, "1"))])
            .await
            .unwrap();

        let mut changed = order(1, 2001, "7.25");
        changed.delivery_date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        repo.apply_batch(&[OrderOp::Update(changed.clone())])
            .await
            .unwrap();

        assert_eq!(repo.list_orders().await.unwrap(), vec![changed]);
    }

    #[tokio::test]
    async fn test_delete_only_touches_target() {
        let repo = setup_repo().await;
        repo.apply_batch(&[
            OrderOp::Insert(order(1, 1001, "1")),
            OrderOp::Insert(order(2, 1002, "2")),
        ])
        .await
        .unwrap();

        repo.apply_batch(&[OrderOp::Delete(OrderId::new(1)), OrderOp::Delete(OrderId::new(9))])
            .await
            .unwrap();

        assert_eq!(repo.list_orders().await.unwrap(), vec![order(2, 1002, "2")]);
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let repo = setup_repo().await;

        repo.apply_batch(&[OrderOp::Upsert(order(1, 1001, "1"))])
            .await
            .unwrap();
        repo.apply_batch(&[OrderOp::Upsert(order(1, 1001, "3.5"))])
            .await
            .unwrap();

        assert_eq!(repo.list_orders().await.unwrap(), vec![order(1, 1001, "3.5")]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_changed_order_number() {
        let repo = setup_repo().await;
        repo.apply_batch(&[OrderOp::Upsert(order(1, 1001, "1"))])
            .await
            .unwrap();

        repo.apply_batch(&[OrderOp::Upsert(order(1, 1500, "1"))])
            .await
            .unwrap();

        assert_eq!(repo.list_orders().await.unwrap(), vec![order(1, 1500, "1")]);
    }

    #[tokio::test]
    async fn test_upsert_moves_order_number_to_new_id() {
        let repo = setup_repo().await;
        repo.apply_batch(&[
            OrderOp::Upsert(order(1, 1001, "1")),
            OrderOp::Upsert(order(2, 1002, "2")),
        ])
        .await
        .unwrap();

        // Row 1 was removed from the sheet and row 2 now carries order 1001
        repo.apply_batch(&[OrderOp::Upsert(order(2, 1001, "9"))])
            .await
            .unwrap();

        assert_eq!(repo.list_orders().await.unwrap(), vec![order(2, 1001, "9")]);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let repo = setup_repo().await;
        repo.apply_batch(&[OrderOp::Insert(order(1, 1001, "1"))])
            .await
            .unwrap();

        let result = repo
            .apply_batch(&[
                OrderOp::Delete(OrderId::new(1)),
                OrderOp::Insert(order(2, 1002, "2")),
                // Duplicate order number violates the unique constraint
                OrderOp::Insert(order(3, 1002, "3")),
            ])
            .await;

        assert!(matches!(result, Err(RepoError::Conflict(_))));
        assert_eq!(repo.list_orders().await.unwrap(), vec![order(1, 1001, "1")]);
    }

    #[tokio::test]
    async fn test_decimal_precision_survives_round_trip() {
        let repo = setup_repo().await;
        let precise = order(1, 1001, "123456789.123456");
        repo.apply_batch(&[OrderOp::Insert(precise.clone())])
            .await
            .unwrap();

        let stored = repo.list_orders().await.unwrap();

        assert_eq!(stored[0].price_usd, precise.price_usd);
    }
}
