//! Polling loop: fetch → normalize → reconcile → sleep.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use exchange_rates::{ExchangeError, RateCache, RateSource, USD_RATE_ID};
use orders_types::{
    BatchSummary, OrderRepository, OrderSource, ReconcileStrategy, RepoError, SourceError,
};
use tracing::{debug, error, info, instrument};

use crate::{Reconciler, RetryPolicy, RowNormalizer, SyncError};

/// Default pause between cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Loop settings.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub retry: RetryPolicy,
    pub strategy: ReconcileStrategy,
    /// Rate table id used for conversion (`R01235` is USD).
    pub rate_id: String,
    /// Time source for rate cache windows.
    pub clock: fn() -> DateTime<Utc>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            retry: RetryPolicy::default(),
            strategy: ReconcileStrategy::default(),
            rate_id: USD_RATE_ID.to_string(),
            clock: Utc::now,
        }
    }
}

/// Drives reconciliation cycles against a row source and a repository.
pub struct Poller<S, R, Q>
where
    S: OrderSource,
    R: OrderRepository,
    Q: RateSource,
{
    source: S,
    repo: R,
    rates: RateCache<Q>,
    normalizer: RowNormalizer,
    reconciler: Reconciler,
    interval: Duration,
    retry: RetryPolicy,
    clock: fn() -> DateTime<Utc>,
    schema_ready: AtomicBool,
}

fn rates_transient(err: &ExchangeError) -> bool {
    match err {
        ExchangeError::ServiceUnavailable(_) => true,
        ExchangeError::Status(status) => *status >= 500 || *status == 429,
        ExchangeError::Parse(_) => false,
    }
}

fn storage_transient(err: &RepoError) -> bool {
    !matches!(err, RepoError::Conflict(_))
}

impl<S, R, Q> Poller<S, R, Q>
where
    S: OrderSource,
    R: OrderRepository,
    Q: RateSource,
{
    pub fn new(source: S, repo: R, rates: RateCache<Q>, config: PollerConfig) -> Self {
        Self {
            source,
            repo,
            rates,
            normalizer: RowNormalizer::new(config.rate_id),
            reconciler: Reconciler::new(config.strategy),
            interval: config.interval,
            retry: config.retry,
            clock: config.clock,
            schema_ready: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Creates the table once; a failed attempt is repeated next cycle.
    async fn ensure_schema(&self) -> Result<(), RepoError> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        self.retry
            .run("ensure_schema", || self.repo.ensure_schema(), storage_transient)
            .await?;

        self.schema_ready.store(true, Ordering::Release);
        debug!("Orders schema ready");
        Ok(())
    }

    /// Runs a single cycle and commits its batch.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<BatchSummary, SyncError> {
        self.ensure_schema().await?;

        let rows = self
            .retry
            .run("fetch_rows", || self.source.fetch_rows(), |e: &SourceError| !e.is_fatal())
            .await?;

        if rows.is_empty() {
            info!("No data found");
            return Ok(BatchSummary::default());
        }

        let now = (self.clock)();
        let rates = self
            .retry
            .run("fetch_rates", || self.rates.get_rate(now), rates_transient)
            .await?;
        debug!(rows = rows.len(), rate_date = %rates.date(), "Normalizing rows");

        let summary = self
            .retry
            .run(
                "reconcile",
                || {
                    self.reconciler
                        .reconcile(&self.repo, self.normalizer.normalize_all(&rows, &rates))
                },
                storage_transient,
            )
            .await?;

        Ok(summary)
    }

    /// Runs cycles until `shutdown` resolves or a fatal error occurs.
    ///
    /// Non-fatal errors abandon the current cycle only. Shutdown is observed
    /// between cycles and during the sleep.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), SyncError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            interval_secs = self.interval.as_secs(),
            strategy = %self.reconciler.strategy(),
            "Starting order sync loop"
        );

        loop {
            match self.run_once().await {
                Ok(summary) => debug!(%summary, "Cycle finished"),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Fatal sync error, stopping loop");
                    return Err(e);
                }
                Err(e) => error!(error = %e, "Cycle abandoned"),
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Sync loop stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
