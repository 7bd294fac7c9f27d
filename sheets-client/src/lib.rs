//! # Sheets Client
//!
//! A typed client for the Google Sheets `values.get` endpoint, exposed as an
//! [`OrderSource`].

mod token;

pub use token::{TokenError, TokenSource};

use orders_types::{OrderSource, RawRow, SourceError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Default public API endpoint.
pub const DEFAULT_API_URL: &str = "https://sheets.googleapis.com";

/// Default range: four columns, skipping the header row.
pub const DEFAULT_RANGE: &str = "A2:D";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Sheets API client bound to one spreadsheet range.
pub struct SheetsClient {
    base_url: String,
    spreadsheet_id: String,
    range: String,
    token: TokenSource,
    http: Client,
}

impl SheetsClient {
    /// Creates a new client.
    pub fn new(
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        token: TokenSource,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            range: DEFAULT_RANGE.to_string(),
            token,
            http: Client::new(),
        }
    }

    /// Sets the A1 range to read.
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    /// Uses a preconfigured `reqwest::Client` (timeouts, proxies).
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    fn values_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, self.range
        )
    }
}

#[async_trait::async_trait]
impl OrderSource for SheetsClient {
    #[instrument(skip(self), fields(range = %self.range))]
    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let token = self
            .token
            .access_token()
            .await
            .map_err(|e| SourceError::Unauthorized(e.to_string()))?;

        let resp = self
            .http
            .get(self.values_url())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Unauthorized(format!("HTTP {status}: {message}")));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ValueRange = resp
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let rows: Vec<RawRow> = body
            .values
            .into_iter()
            .map(|cells| cells.into_iter().map(cell_text).collect())
            .collect();

        debug!(rows = rows.len(), "Fetched sheet rows");
        Ok(rows)
    }
}

fn cell_text(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
