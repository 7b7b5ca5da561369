//! Yahoo Finance provider (primary feed).
//!
//! Fetches daily closes from Yahoo's v8 chart API. One request per fetch: the
//! resolver's fallback chain handles failure, so there is no retry loop here.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; every shape surprise maps to `ResponseFormatChanged`.

use super::provider::{DataProvider, FetchResult, SourceError};
use crate::domain::{PricePoint, Series};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| SourceError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(start_ts);
        format!(
            "{}/v8/finance/chart/{symbol}?period1={start_ts}&period2={end_ts}&interval=1d",
            self.base_url
        )
    }
}

/// Parse the chart API response into a validated series.
///
/// Days without a close (holidays, halted sessions) are skipped.
fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Series, SourceError> {
    let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
        Some(err) if err.code == "Not Found" => SourceError::SymbolNotFound {
            symbol: symbol.to_string(),
        },
        Some(err) => {
            SourceError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
        }
        None => SourceError::ResponseFormatChanged("empty result with no error".into()),
    })?;

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("result array is empty".into()))?;

    // A valid symbol with no trading days in range comes back without timestamps.
    let timestamps = data.timestamp.unwrap_or_default();

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::ResponseFormatChanged("no quote data".into()))?;

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| SourceError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        if !close.is_finite() {
            continue;
        }
        // Intraday updates for the current session can repeat the last date.
        if points.last().is_some_and(|p: &PricePoint| p.date == date) {
            points.pop();
        }
        points.push(PricePoint::new(date, close));
    }

    if points.is_empty() {
        return Err(SourceError::EmptySeries {
            symbol: symbol.to_string(),
        });
    }

    Ok(Series::new(points)?)
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, SourceError> {
        let url = self.chart_url(symbol, start, end);
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| SourceError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited(format!("HTTP 429 for {symbol}")));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(SourceError::AuthenticationRequired(format!(
                "Yahoo Finance answered HTTP {status}"
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            SourceError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let series = parse_response(symbol, chart)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            series,
        })
    }
}
