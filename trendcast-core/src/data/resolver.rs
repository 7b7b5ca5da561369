//! Source resolution: the provider fallback chain.
//!
//! Providers are tried once each, in priority order:
//! 1. A provider that reports itself unavailable is skipped without a call
//! 2. The first provider returning a non-empty series wins
//! 3. If every provider fails → deterministic placeholder, tagged `synthetic`
//!
//! Resolution never fails outward. Callers inspect the provenance to decide
//! whether the series is fit for their purpose.

use super::provider::{DataProvider, SourceError};
use super::synthetic::placeholder_series;
use crate::domain::{Provenance, Series};
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

/// Default amount of history requested from each provider.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

/// Upper bound on the requested history (about a century).
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// A provider in the chain together with the provenance it confers.
pub struct Source {
    pub provenance: Provenance,
    pub provider: Box<dyn DataProvider>,
}

/// What happened when the resolver consulted one provider.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceAttempt {
    pub provider: String,
    pub provenance: Provenance,
    pub outcome: AttemptOutcome,
}

/// Result of a resolution: always a usable, non-empty series.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub symbol: String,
    pub series: Series,
    pub provenance: Provenance,
    pub attempts: Vec<SourceAttempt>,
}

pub struct SourceResolver {
    sources: Vec<Source>,
    lookback_days: i64,
    as_of: NaiveDate,
}

impl SourceResolver {
    /// Empty chain resolving up to `as_of`. Add providers with [`Self::with_source`].
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            sources: Vec::new(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            as_of,
        }
    }

    /// Append a provider at the lowest priority so far.
    pub fn with_source(mut self, provenance: Provenance, provider: Box<dyn DataProvider>) -> Self {
        self.sources.push(Source {
            provenance,
            provider,
        });
        self
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days.clamp(1, MAX_LOOKBACK_DAYS);
        self
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn resolve(&self, symbol: &str) -> Resolution {
        let end = self.as_of;
        let start = end
            .checked_sub_signed(Duration::days(self.lookback_days))
            .unwrap_or(NaiveDate::MIN);
        let mut attempts = Vec::with_capacity(self.sources.len());

        for source in &self.sources {
            let name = source.provider.name().to_string();

            if !source.provider.is_available() {
                info!(provider = %name, "provider unavailable, skipping");
                attempts.push(SourceAttempt {
                    provider: name,
                    provenance: source.provenance,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            }

            debug!(provider = %name, symbol, %start, %end, "fetching");
            match fetch_non_empty(source.provider.as_ref(), symbol, start, end) {
                Ok(series) => {
                    info!(
                        provider = %name,
                        provenance = %source.provenance,
                        points = series.len(),
                        "series resolved"
                    );
                    attempts.push(SourceAttempt {
                        provider: name,
                        provenance: source.provenance,
                        outcome: AttemptOutcome::Succeeded,
                    });
                    return Resolution {
                        symbol: symbol.to_string(),
                        series,
                        provenance: source.provenance,
                        attempts,
                    };
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "provider failed, falling back");
                    attempts.push(SourceAttempt {
                        provider: name,
                        provenance: source.provenance,
                        outcome: AttemptOutcome::Failed(e.to_string()),
                    });
                }
            }
        }

        warn!(symbol, "all providers failed, using synthetic placeholder series");
        Resolution {
            symbol: symbol.to_string(),
            series: placeholder_series(self.as_of),
            provenance: Provenance::Synthetic,
            attempts,
        }
    }
}

fn fetch_non_empty(
    provider: &dyn DataProvider,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Series, SourceError> {
    let result = provider.fetch(symbol, start, end)?;
    if result.series.is_empty() {
        return Err(SourceError::EmptySeries {
            symbol: symbol.to_string(),
        });
    }
    Ok(result.series)
}
