//! Collection stage.
//!
//! Resolves the configured symbol through the provider chain
//! (primary → secondary → synthetic), caches the series, and records which
//! source produced it. The provenance file is what later stages key on.

use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use trendcast_core::artifacts::{ArtifactError, ArtifactKeys, ArtifactStore};
use trendcast_core::data::cache::series_to_parquet;
use trendcast_core::data::{
    AlphaVantageProvider, CacheError, CacheMeta, ParquetCache, SourceAttempt, SourceError,
    SourceResolver, YahooProvider,
};
use trendcast_core::domain::{write_provenance, Provenance, ProvenanceError};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to build provider: {0}")]
    Provider(#[from] SourceError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Provenance(#[from] ProvenanceError),

    #[error("upload failed: {0}")]
    Upload(#[from] ArtifactError),
}

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub symbol: String,
    pub provenance_file: PathBuf,
    /// Push the series and provenance blob to the artifact store.
    pub upload: bool,
}

#[derive(Debug, Clone)]
pub struct CollectReport {
    pub symbol: String,
    pub provenance: Provenance,
    pub attempts: Vec<SourceAttempt>,
    pub meta: CacheMeta,
    pub uploaded: bool,
}

/// Yahoo as primary, Alpha Vantage (key from the environment) as secondary.
pub fn default_resolver(
    as_of: NaiveDate,
    timeout: Duration,
    lookback_days: i64,
) -> Result<SourceResolver, SourceError> {
    Ok(SourceResolver::new(as_of)
        .with_lookback_days(lookback_days)
        .with_source(Provenance::Primary, Box::new(YahooProvider::new(timeout)?))
        .with_source(
            Provenance::Secondary,
            Box::new(AlphaVantageProvider::from_env(timeout)?),
        ))
}

pub fn run_collect(
    resolver: &SourceResolver,
    cache: &ParquetCache,
    store: Option<&dyn ArtifactStore>,
    opts: &CollectOptions,
) -> Result<CollectReport, CollectError> {
    let resolution = resolver.resolve(&opts.symbol);
    let provenance = resolution.provenance;

    let meta = cache.write(&opts.symbol, &resolution.series, provenance)?;
    write_provenance(&opts.provenance_file, provenance)?;
    info!(
        symbol = %opts.symbol,
        %provenance,
        points = meta.point_count,
        start = %meta.start_date,
        end = %meta.end_date,
        "collected series"
    );

    let uploaded = match store {
        Some(store) if opts.upload => {
            let series_key = ArtifactKeys::series(&opts.symbol);
            store.put(&series_key, &series_to_parquet(&resolution.series)?)?;
            store.put(
                ArtifactKeys::provenance_key(),
                format!("{provenance}\n").as_bytes(),
            )?;
            info!(store = %store.describe(), key = %series_key, "uploaded series");
            true
        }
        _ => false,
    };

    Ok(CollectReport {
        symbol: opts.symbol.clone(),
        provenance,
        attempts: resolution.attempts,
        meta,
        uploaded,
    })
}
