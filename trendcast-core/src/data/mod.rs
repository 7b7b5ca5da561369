//! Data acquisition: providers, the fallback resolver, and the series cache.

pub mod alpha_vantage;
pub mod cache;
pub mod provider;
pub mod resolver;
pub mod synthetic;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageProvider;
pub use cache::{CacheError, CacheMeta, ParquetCache};
pub use provider::{DataProvider, FetchResult, SourceError};
pub use resolver::{
    AttemptOutcome, Resolution, SourceAttempt, SourceResolver, DEFAULT_LOOKBACK_DAYS,
    MAX_LOOKBACK_DAYS,
};
pub use synthetic::placeholder_series;
pub use yahoo::YahooProvider;
