//! Central Bank of Russia daily rates client.

use std::str::FromStr;

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{ExchangeError, RateSource, RateTable};

#[derive(Debug, Deserialize)]
struct ValCurs {
    #[serde(rename = "@Date", default)]
    date: Option<String>,
    #[serde(rename = "Valute", default)]
    valutes: Vec<Valute>,
}

#[derive(Debug, Deserialize)]
struct Valute {
    #[serde(rename = "@ID")]
    id: String,
    #[serde(rename = "Nominal")]
    nominal: String,
    #[serde(rename = "Value")]
    value: String,
}

/// HTTP client for `XML_daily.asp`.
#[derive(Clone)]
pub struct CbrClient {
    base_url: String,
    http: Client,
}

impl CbrClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Creates a client on top of a preconfigured `reqwest::Client`.
    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    fn daily_url(&self) -> String {
        format!("{}/scripts/XML_daily.asp", self.base_url)
    }
}

#[async_trait::async_trait]
impl RateSource for CbrClient {
    #[instrument(skip(self))]
    async fn fetch_rates(&self, date: NaiveDate) -> Result<RateTable, ExchangeError> {
        let date_req = date.format("%d/%m/%Y").to_string();
        let resp = self
            .http
            .get(self.daily_url())
            .query(&[("date_req", date_req.as_str())])
            .send()
            .await
            .map_err(|e| ExchangeError::ServiceUnavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExchangeError::Status(status.as_u16()));
        }

        // reqwest decodes the windows-1251 body using the response charset
        let body = resp
            .text()
            .await
            .map_err(|e| ExchangeError::ServiceUnavailable(e.to_string()))?;

        let table = parse_daily(&body, date)?;
        debug!(entries = table.len(), date = %table.date(), "Fetched rate table");
        Ok(table)
    }
}

/// Parses a `ValCurs` document into a per-unit rate table.
///
/// `fallback_date` is used when the document carries no `Date` attribute.
pub(crate) fn parse_daily(xml: &str, fallback_date: NaiveDate) -> Result<RateTable, ExchangeError> {
    let doc: ValCurs =
        quick_xml::de::from_str(xml).map_err(|e| ExchangeError::Parse(e.to_string()))?;

    let date = match doc.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw, "%d.%m.%Y")
            .map_err(|e| ExchangeError::Parse(format!("invalid Date {raw:?}: {e}")))?,
        None => fallback_date,
    };

    let mut table = RateTable::new(date);
    for valute in doc.valutes {
        let value = parse_cbr_decimal(&valute.value)?;
        let nominal = parse_cbr_decimal(&valute.nominal)?;
        if nominal.is_zero() {
            return Err(ExchangeError::Parse(format!(
                "zero nominal for {}",
                valute.id
            )));
        }
        table.insert(valute.id, value / nominal);
    }

    Ok(table)
}

/// CBR publishes decimals with a comma separator.
fn parse_cbr_decimal(raw: &str) -> Result<Decimal, ExchangeError> {
    let normalized = raw.trim().replace(',', ".");
    Decimal::from_str(&normalized)
        .map_err(|e| ExchangeError::Parse(format!("invalid decimal {raw:?}: {e}")))
}
