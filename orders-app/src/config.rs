//! Configuration loading from environment.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use exchange_rates::{DEFAULT_CACHE_WINDOW, USD_RATE_ID};
use orders_hex::RetryPolicy;
use orders_hex::poller::DEFAULT_POLL_INTERVAL;
use orders_repo::DatabaseSettings;
use orders_types::ReconcileStrategy;
use sheets_client::{DEFAULT_API_URL, DEFAULT_RANGE, TokenSource};

const DEFAULT_CBR_URL: &str = "https://www.cbr.ru";
const DEFAULT_TOKEN_FILE: &str = "token.json";
const DEFAULT_PORT: u16 = 8000;

const DB_VARS: [&str; 5] = ["DB_NAME", "DB_USER", "DB_PASSWORD", "DB_HOST", "DB_PORT"];

/// Where the orders table lives.
#[derive(Debug, Clone)]
pub enum DatabaseTarget {
    /// `DATABASE_URL`, any scheme the enabled repo features support.
    Url(String),
    /// PostgreSQL given as `DB_*` parts.
    Parts(DatabaseSettings),
}

impl fmt::Display for DatabaseTarget {
    // Never prints credentials
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseTarget::Url(url) => {
                let scheme = url.split("://").next().unwrap_or("database");
                let location = url.rsplit('@').next().unwrap_or(url);
                if location == url.as_str() {
                    write!(f, "{url}")
                } else {
                    write!(f, "{scheme}://{location}")
                }
            }
            DatabaseTarget::Parts(s) => {
                write!(f, "postgres://{}:{}/{}", s.host, s.port, s.name)
            }
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub spreadsheet_id: String,
    pub sheet_range: String,
    pub database: DatabaseTarget,
    pub poll_interval: Duration,
    pub rate_window: Duration,
    pub rate_id: String,
    pub strategy: ReconcileStrategy,
    pub sheets_api_url: String,
    pub cbr_base_url: String,
    pub token: TokenSource,
    pub port: u16,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub view_rate_limit: u32,
    /// Key the view's rate limit on `X-Forwarded-For` (behind a proxy only).
    pub trust_forwarded_for: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let spreadsheet_id = get("SPREADSHEET_ID")
            .ok_or_else(|| anyhow!("SPREADSHEET_ID environment variable is required"))?;

        let database = match get("DATABASE_URL") {
            Some(url) => DatabaseTarget::Url(url),
            None => {
                let missing: Vec<&str> = DB_VARS
                    .iter()
                    .copied()
                    .filter(|&k| get(k).is_none())
                    .collect();
                if !missing.is_empty() {
                    return Err(anyhow!(
                        "missing database settings: {} (or set DATABASE_URL)",
                        missing.join(", ")
                    ));
                }
                DatabaseTarget::Parts(DatabaseSettings {
                    name: get("DB_NAME").unwrap_or_default(),
                    user: get("DB_USER").unwrap_or_default(),
                    password: get("DB_PASSWORD").unwrap_or_default(),
                    host: get("DB_HOST").unwrap_or_default(),
                    port: parse(&get, "DB_PORT", 5432)?,
                })
            }
        };

        let token = match get("GOOGLE_ACCESS_TOKEN") {
            Some(token) => TokenSource::Static(token),
            None => TokenSource::File(PathBuf::from(
                get("GOOGLE_TOKEN_FILE").unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string()),
            )),
        };

        let retry = RetryPolicy::new(
            parse(&get, "RETRY_ATTEMPTS", RetryPolicy::default().max_attempts)?,
            Duration::from_millis(parse(
                &get,
                "RETRY_BASE_DELAY_MS",
                RetryPolicy::default().base_delay.as_millis() as u64,
            )?),
        );

        let strategy = match get("RECONCILE_STRATEGY") {
            Some(raw) => raw
                .parse::<ReconcileStrategy>()
                .map_err(|e| anyhow!("RECONCILE_STRATEGY: {e}"))?,
            None => ReconcileStrategy::default(),
        };

        Ok(Self {
            spreadsheet_id,
            sheet_range: get("SHEET_RANGE").unwrap_or_else(|| DEFAULT_RANGE.to_string()),
            database,
            poll_interval: Duration::from_secs(parse(
                &get,
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL.as_secs(),
            )?),
            rate_window: Duration::from_secs(parse(
                &get,
                "RATE_CACHE_WINDOW_SECS",
                DEFAULT_CACHE_WINDOW.as_secs(),
            )?),
            rate_id: get("RATE_CURRENCY_ID").unwrap_or_else(|| USD_RATE_ID.to_string()),
            strategy,
            sheets_api_url: get("SHEETS_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            cbr_base_url: get("CBR_BASE_URL").unwrap_or_else(|| DEFAULT_CBR_URL.to_string()),
            token,
            port: parse(&get, "PORT", DEFAULT_PORT)?,
            http_timeout: Duration::from_secs(parse(&get, "HTTP_TIMEOUT_SECS", 30)?),
            retry,
            view_rate_limit: parse(&get, "VIEW_RATE_LIMIT_PER_MINUTE", 100)?,
            trust_forwarded_for: parse(&get, "TRUST_FORWARDED_FOR", false)?,
        })
    }
}

fn parse<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
