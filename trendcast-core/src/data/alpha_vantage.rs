//! Alpha Vantage provider (secondary feed).
//!
//! Uses the `TIME_SERIES_DAILY` endpoint. The provider is only available when
//! an API key is configured; without one the resolver skips it entirely.

use super::provider::{DataProvider, FetchResult, SourceError};
use crate::domain::{PricePoint, Series};
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<NaiveDate, DailyEntry>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyEntry {
    #[serde(rename = "4. close")]
    close: String,
}

pub struct AlphaVantageProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl AlphaVantageProvider {
    pub fn new(api_key: Option<SecretString>, timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, timeout)
    }

    /// Read the API key from `ALPHAVANTAGE_API_KEY`; an unset or blank value
    /// leaves the provider unavailable.
    pub fn from_env(timeout: Duration) -> Result<Self, SourceError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(|k| SecretString::new(k.into()));
        Self::new(api_key, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

/// Convert the daily map into a series restricted to `[start, end]`.
fn parse_response(
    symbol: &str,
    resp: DailyResponse,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Series, SourceError> {
    if let Some(msg) = resp.error_message {
        return Err(SourceError::SymbolNotFound {
            symbol: format!("{symbol} ({msg})"),
        });
    }
    if let Some(note) = resp.note.or(resp.information) {
        return Err(SourceError::RateLimited(note));
    }
    let daily = resp
        .series
        .ok_or_else(|| SourceError::ResponseFormatChanged("missing 'Time Series (Daily)'".into()))?;

    let mut points = Vec::with_capacity(daily.len());
    // BTreeMap iterates dates in ascending order.
    for (date, entry) in daily.range(start..=end) {
        let close: f64 = entry.close.trim().parse().map_err(|_| {
            SourceError::ResponseFormatChanged(format!("unparseable close '{}' on {date}", entry.close))
        })?;
        points.push(PricePoint::new(*date, close));
    }

    if points.is_empty() {
        return Err(SourceError::EmptySeries {
            symbol: symbol.to_string(),
        });
    }
    Ok(Series::new(points)?)
}

impl DataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, SourceError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            SourceError::AuthenticationRequired(format!("{API_KEY_ENV} is not set"))
        })?;

        let resp = self
            .client
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "compact"),
                ("apikey", key.expose_secret()),
            ])
            .send()
            .map_err(|e| SourceError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body: DailyResponse = resp.json().map_err(|e| {
            SourceError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let series = parse_response(symbol, body, start, end)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            series,
        })
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}
