//! Data provider trait and the uniform source failure signal.
//!
//! The `DataProvider` trait abstracts over upstream price feeds so the
//! resolver can try them in order and tests can substitute scripted feeds.

use crate::domain::{Series, SeriesError};
use chrono::NaiveDate;
use thiserror::Error;

/// Why a provider could not produce a usable series.
///
/// Always absorbed by the resolver's fallback chain; never reaches a caller
/// of `resolve`.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("HTTP {status} from provider")]
    HttpStatus { status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider returned an empty series for {symbol}")]
    EmptySeries { symbol: String },

    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),

    #[error("source error: {0}")]
    Other(String),
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub series: Series,
}

/// An upstream daily price feed.
pub trait DataProvider: Send + Sync {
    /// Short stable name, used in logs and attempt records.
    fn name(&self) -> &str;

    /// Fetch daily closes for a symbol over an inclusive date range.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, SourceError>;

    /// Whether the provider can be attempted at all (e.g. credential present).
    fn is_available(&self) -> bool {
        true
    }
}
