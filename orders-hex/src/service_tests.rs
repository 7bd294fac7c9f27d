//! Poller and service tests against in-memory adapters.

use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use exchange_rates::{ExchangeError, RateCache, RateSource, RateTable, USD_RATE_ID};
use orders_types::{
    AppError, OrderId, OrderOp, OrderRecord, OrderRepository, OrderSnapshot, OrderSource, RawRow,
    ReconcileStrategy, RepoError, SourceError,
};
use rust_decimal::Decimal;

use crate::{OrderService, Poller, PollerConfig, RetryPolicy, SyncError};

// ─────────────────────────────────────────────────────────────────────────────
// Mock adapters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockRepo {
    orders: Mutex<BTreeMap<OrderId, OrderRecord>>,
    schema_failures: AtomicU32,
    batch_failures: AtomicU32,
    schema_calls: AtomicU32,
    batch_calls: AtomicU32,
}

impl MockRepo {
    fn failing_schema(times: u32) -> Self {
        let repo = Self::default();
        repo.schema_failures.store(times, Ordering::SeqCst);
        repo
    }

    fn failing_batches(times: u32) -> Self {
        let repo = Self::default();
        repo.batch_failures.store(times, Ordering::SeqCst);
        repo
    }

    fn ids(&self) -> Vec<i32> {
        self.orders.lock().unwrap().keys().map(|id| id.get()).collect()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl OrderRepository for MockRepo {
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        self.schema_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.schema_failures) {
            return Err(RepoError::Connection("connection refused".into()));
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<OrderSnapshot, RepoError> {
        Ok(OrderSnapshot::new(self.orders.lock().unwrap().keys().copied()))
    }

    async fn apply_batch(&self, ops: &[OrderOp]) -> Result<(), RepoError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.batch_failures) {
            return Err(RepoError::Connection("connection reset".into()));
        }

        let mut orders = self.orders.lock().unwrap();
        for op in ops {
            match op {
                OrderOp::Insert(order) => {
                    orders.insert(order.id, order.clone());
                }
                OrderOp::Update(order) => {
                    if let Some(existing) = orders.get_mut(&order.id) {
                        *existing = order.clone();
                    }
                }
                OrderOp::Upsert(order) => {
                    orders.retain(|_, o| o.order_number != order.order_number);
                    orders.insert(order.id, order.clone());
                }
                OrderOp::Delete(id) => {
                    orders.remove(id);
                }
            }
        }
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError> {
        Ok(self.orders.lock().unwrap().values().cloned().collect())
    }
}

/// Serves queued responses, then empty sheets.
#[derive(Default)]
struct MockSource {
    responses: Mutex<VecDeque<Result<Vec<RawRow>, SourceError>>>,
    calls: AtomicU32,
}

impl MockSource {
    fn with(responses: Vec<Result<Vec<RawRow>, SourceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl OrderSource for MockSource {
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[derive(Default)]
struct MockRateSource {
    calls: AtomicU32,
}

#[async_trait]
impl RateSource for MockRateSource {
    async fn fetch_rates(&self, date: NaiveDate) -> Result<RateTable, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RateTable::new(date).with_rate(USD_RATE_ID, Decimal::from_str("90.1234").unwrap()))
    }
}

struct DownRateSource;

#[async_trait]
impl RateSource for DownRateSource {
    async fn fetch_rates(&self, _date: NaiveDate) -> Result<RateTable, ExchangeError> {
        Err(ExchangeError::ServiceUnavailable("connection refused".into()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn row(fields: &[&str]) -> RawRow {
    fields.iter().copied().collect()
}

fn sheet(rows: &[&[&str]]) -> Result<Vec<RawRow>, SourceError> {
    Ok(rows.iter().map(|r| row(r)).collect())
}

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

fn config(strategy: ReconcileStrategy) -> PollerConfig {
    PollerConfig {
        interval: Duration::from_millis(10),
        retry: RetryPolicy::new(2, Duration::from_millis(1)),
        strategy,
        clock: fixed_clock,
        ..PollerConfig::default()
    }
}

fn poller<Q: RateSource>(
    source: MockSource,
    repo: MockRepo,
    rates: Q,
) -> Poller<MockSource, MockRepo, Q> {
    Poller::new(
        source,
        repo,
        RateCache::new(rates, Duration::from_secs(4 * 60 * 60)),
        config(ReconcileStrategy::Upsert),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Poller cycles
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cycle_persists_converted_orders() {
    let source = MockSource::with(vec![sheet(&[&["5", "1001", "19.99", "01.03.2024"]])]);
    let poller = poller(source, MockRepo::default(), MockRateSource::default());

    let summary = poller.run_once().await.unwrap();

    assert_eq!(summary.upserted, 1);
    let orders = poller.repo().list_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order_number, 1001);
    assert_eq!(orders[0].price_rub, Decimal::from_str("1801.566766").unwrap());
}

#[tokio::test]
async fn test_same_rows_twice_is_idempotent() {
    let rows: &[&[&str]] = &[
        &["1", "1001", "10", "01.03.2024"],
        &["2", "1002", "20", "02.03.2024"],
    ];
    let source = MockSource::with(vec![sheet(rows), sheet(rows)]);
    let poller = poller(source, MockRepo::default(), MockRateSource::default());

    poller.run_once().await.unwrap();
    let first = poller.repo().list_orders().await.unwrap();
    poller.run_once().await.unwrap();
    let second = poller.repo().list_orders().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(poller.repo().ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_legacy_strategy_inserts_then_updates() {
    let source = MockSource::with(vec![
        sheet(&[&["1", "1001", "10", "01.03.2024"]]),
        sheet(&[&["1", "1001", "12", "01.03.2024"]]),
    ]);
    let poller = Poller::new(
        source,
        MockRepo::default(),
        RateCache::new(MockRateSource::default(), Duration::from_secs(60)),
        config(ReconcileStrategy::Legacy),
    );

    let first = poller.run_once().await.unwrap();
    let second = poller.run_once().await.unwrap();

    assert_eq!(first.inserted, 1);
    assert_eq!(second.updated, 1);
    let orders = poller.repo().list_orders().await.unwrap();
    assert_eq!(orders[0].price_usd, Decimal::from(12));
}

#[tokio::test]
async fn test_invalid_row_deletes_only_previous_id() {
    let source = MockSource::with(vec![
        sheet(&[
            &["1", "1001", "10", "01.03.2024"],
            &["5", "1005", "19.99", "01.03.2024"],
        ]),
        sheet(&[
            &["1", "1001", "10", "01.03.2024"],
            &["5", "1005", "19.99", "01.03.2024"],
            &["5", "abc", "x", "bad-date"],
        ]),
    ]);
    let poller = poller(source, MockRepo::default(), MockRateSource::default());

    poller.run_once().await.unwrap();
    assert_eq!(poller.repo().ids(), vec![1, 5]);

    let summary = poller.run_once().await.unwrap();

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.invalid, 1);
    assert_eq!(poller.repo().ids(), vec![1]);
}

#[tokio::test]
async fn test_empty_sheet_commits_nothing() {
    let rates = std::sync::Arc::new(MockRateSource::default());
    let poller = poller(MockSource::default(), MockRepo::default(), rates.clone());

    let summary = poller.run_once().await.unwrap();

    assert_eq!(summary.writes(), 0);
    assert_eq!(poller.repo().batch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(rates.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rates_are_cached_across_cycles() {
    let rows: &[&[&str]] = &[&["1", "1001", "10", "01.03.2024"]];
    let rates = std::sync::Arc::new(MockRateSource::default());
    let poller = poller(
        MockSource::with(vec![sheet(rows), sheet(rows)]),
        MockRepo::default(),
        rates.clone(),
    );

    poller.run_once().await.unwrap();
    poller.run_once().await.unwrap();

    assert_eq!(rates.calls.load(Ordering::SeqCst), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Error classification
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_auth_failure_is_fatal_and_not_retried() {
    let source = MockSource::with(vec![Err(SourceError::Unauthorized("HTTP 401".into()))]);
    let poller = poller(source, MockRepo::default(), MockRateSource::default());

    let result = poller.run(std::future::pending()).await;

    assert!(matches!(result, Err(SyncError::Source(SourceError::Unauthorized(_)))));
    assert_eq!(poller.source().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_transient_source_failure_is_retried() {
    let source = MockSource::with(vec![
        Err(SourceError::Unavailable("timeout".into())),
        sheet(&[&["1", "1001", "10", "01.03.2024"]]),
    ]);
    let poller = poller(source, MockRepo::default(), MockRateSource::default());

    let summary = poller.run_once().await.unwrap();

    assert_eq!(summary.upserted, 1);
    assert_eq!(poller.source().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rate_outage_abandons_cycle() {
    let source = MockSource::with(vec![sheet(&[&["1", "1001", "10", "01.03.2024"]])]);
    let poller = poller(source, MockRepo::default(), DownRateSource);

    let err = poller.run_once().await.unwrap_err();

    assert!(matches!(err, SyncError::Rates(_)));
    assert!(!err.is_fatal());
    assert!(poller.repo().ids().is_empty());
}

#[tokio::test]
async fn test_storage_failure_abandons_cycle_after_retries() {
    let source = MockSource::with(vec![sheet(&[&["1", "1001", "10", "01.03.2024"]])]);
    let poller = poller(source, MockRepo::failing_batches(5), MockRateSource::default());

    let err = poller.run_once().await.unwrap_err();

    assert!(matches!(err, SyncError::Storage(RepoError::Connection(_))));
    assert!(!err.is_fatal());
    assert_eq!(poller.repo().batch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_schema_creation_is_retried_next_cycle() {
    let poller = poller(
        MockSource::default(),
        MockRepo::failing_schema(2),
        MockRateSource::default(),
    );

    assert!(matches!(poller.run_once().await, Err(SyncError::Storage(_))));
    poller.run_once().await.unwrap();
    poller.run_once().await.unwrap();

    // Two failed attempts, one success, then no further calls
    assert_eq!(poller.repo().schema_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_loop_survives_failed_cycles_until_shutdown() {
    let source = MockSource::with(vec![
        Err(SourceError::Unavailable("timeout".into())),
        Err(SourceError::Unavailable("timeout".into())),
        sheet(&[&["1", "1001", "10", "01.03.2024"]]),
    ]);
    let poller = poller(source, MockRepo::default(), MockRateSource::default());

    let result = poller
        .run(tokio::time::sleep(Duration::from_millis(200)))
        .await;

    assert!(result.is_ok());
    assert!(poller.source().calls.load(Ordering::SeqCst) >= 3);
    assert_eq!(poller.repo().ids(), vec![1]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

struct DownRepo;

#[async_trait]
impl OrderRepository for DownRepo {
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        Err(RepoError::Connection("down".into()))
    }

    async fn snapshot(&self) -> Result<OrderSnapshot, RepoError> {
        Err(RepoError::Connection("down".into()))
    }

    async fn apply_batch(&self, _ops: &[OrderOp]) -> Result<(), RepoError> {
        Err(RepoError::Connection("down".into()))
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, RepoError> {
        Err(RepoError::Connection("down".into()))
    }
}

#[tokio::test]
async fn test_service_maps_connection_errors_to_unavailable() {
    let service = OrderService::new(DownRepo);

    let result = service.list_orders().await;

    assert!(matches!(result, Err(AppError::Unavailable(_))));
}
