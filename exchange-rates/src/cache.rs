//! Fixed-window rate table cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{ExchangeError, RateSource, RateTable};

/// Default cache window: four hours.
pub const DEFAULT_CACHE_WINDOW: Duration = Duration::from_secs(4 * 60 * 60);

/// CBR publishes by Moscow date; Moscow has been UTC+3 all year since 2014.
const MOSCOW_UTC_OFFSET_HOURS: i64 = 3;

/// Calendar date in Moscow at `now`.
pub fn moscow_date(now: DateTime<Utc>) -> NaiveDate {
    (now + chrono::Duration::hours(MOSCOW_UTC_OFFSET_HOURS)).date_naive()
}

struct Cached {
    window: i64,
    table: Arc<RateTable>,
}

/// Caches one rate table per time window.
///
/// Windows are aligned to the unix epoch (`timestamp / window`), so a refresh
/// happens at fixed wall-clock boundaries rather than a fixed time after the
/// last fetch.
pub struct RateCache<S: RateSource> {
    source: S,
    window_secs: i64,
    cached: Mutex<Option<Cached>>,
}

impl<S: RateSource> RateCache<S> {
    pub fn new(source: S, window: Duration) -> Self {
        let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX).max(1);
        Self {
            source,
            window_secs,
            cached: Mutex::new(None),
        }
    }

    /// Index of the window containing `now`.
    pub fn window_index(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp().div_euclid(self.window_secs)
    }

    /// Returns the table for the window containing `now`, fetching it by
    /// the Moscow calendar date of `now` when the window changed.
    ///
    /// Fetch errors are returned as-is and leave the previous entry in place.
    pub async fn get_rate(&self, now: DateTime<Utc>) -> Result<Arc<RateTable>, ExchangeError> {
        let window = self.window_index(now);
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            if entry.window == window {
                debug!(window, "Rate cache HIT");
                return Ok(Arc::clone(&entry.table));
            }
        }

        debug!(window, "Rate cache MISS");
        let table = Arc::new(self.source.fetch_rates(moscow_date(now)).await?);
        *cached = Some(Cached {
            window,
            table: Arc::clone(&table),
        });
        Ok(table)
    }
}
