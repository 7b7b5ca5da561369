//! Fit stage.
//!
//! Reads the collected series (local cache first, artifact store second),
//! fits the min-max scale and the drift baseline in normalized space, and
//! stores both under the keys derived from the series' provenance.
//!
//! Synthetic series are placeholders, not market data. Fitting on them is
//! refused unless explicitly allowed.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};
use trendcast_core::artifacts::{save_model_artifacts, ArtifactError, ArtifactKeys, ArtifactStore};
use trendcast_core::data::cache::series_from_parquet;
use trendcast_core::data::{CacheError, ParquetCache};
use trendcast_core::domain::{read_provenance, Provenance, ProvenanceError, Series};
use trendcast_core::predictor::{LinearWindowModel, PredictorError};
use trendcast_core::preprocess::{PreprocessError, Scale};

#[derive(Debug, Error)]
pub enum FitError {
    #[error(transparent)]
    Provenance(#[from] ProvenanceError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error(
        "series for '{symbol}' is synthetic; refusing to fit (pass --allow-synthetic to override)"
    )]
    SyntheticRefused { symbol: String },

    #[error("cached series for '{symbol}' is {cached} but the provenance file says {recorded}")]
    ProvenanceMismatch {
        symbol: String,
        cached: Provenance,
        recorded: Provenance,
    },

    #[error("need more than {window_size} points to fit, '{symbol}' has {points}")]
    InsufficientHistory {
        symbol: String,
        window_size: usize,
        points: usize,
    },
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub symbol: String,
    pub window_size: usize,
    pub provenance_file: PathBuf,
    pub allow_synthetic: bool,
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub symbol: String,
    pub provenance: Provenance,
    pub keys: ArtifactKeys,
    pub scale: Scale,
    pub points: usize,
    pub training_pairs: usize,
    /// Mean one-step change in normalized units.
    pub step: f64,
}

/// Local cache first; the store copy is used when nothing is cached locally.
pub fn load_series_for_fit(
    cache: &ParquetCache,
    store: &dyn ArtifactStore,
    symbol: &str,
) -> Result<Series, FitError> {
    match cache.load(symbol) {
        Ok(series) => Ok(series),
        Err(CacheError::NoCachedData { .. }) => {
            let key = ArtifactKeys::series(symbol);
            info!(store = %store.describe(), %key, "no local cache, reading series from store");
            let bytes = store.get(&key)?;
            Ok(series_from_parquet(&bytes)?)
        }
        Err(e) => Err(e.into()),
    }
}

fn resolve_provenance(
    store: &dyn ArtifactStore,
    opts: &FitOptions,
) -> Result<Provenance, FitError> {
    match read_provenance(&opts.provenance_file) {
        Ok(p) => Ok(p),
        Err(ProvenanceError::Io { .. }) => {
            let bytes = store.get(ArtifactKeys::provenance_key())?;
            let text = String::from_utf8_lossy(&bytes);
            Ok(text.parse()?)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn run_fit(
    cache: &ParquetCache,
    store: &dyn ArtifactStore,
    opts: &FitOptions,
) -> Result<FitReport, FitError> {
    let provenance = resolve_provenance(store, opts)?;
    if let Some(meta) = cache.get_meta(&opts.symbol) {
        if meta.provenance != provenance {
            return Err(FitError::ProvenanceMismatch {
                symbol: opts.symbol.clone(),
                cached: meta.provenance,
                recorded: provenance,
            });
        }
    }
    if provenance.is_synthetic() {
        if !opts.allow_synthetic {
            return Err(FitError::SyntheticRefused {
                symbol: opts.symbol.clone(),
            });
        }
        warn!(symbol = %opts.symbol, "fitting on synthetic placeholder data");
    }

    let series = load_series_for_fit(cache, store, &opts.symbol)?;
    let closes = series.closes();
    if closes.len() <= opts.window_size {
        return Err(FitError::InsufficientHistory {
            symbol: opts.symbol.clone(),
            window_size: opts.window_size,
            points: closes.len(),
        });
    }

    let scale = Scale::fit(&closes)?;
    let normalized = scale.apply(&closes)?;
    let model = LinearWindowModel::fit_drift(&normalized, opts.window_size)?;
    let keys = save_model_artifacts(store, provenance, &model, &scale)?;

    let report = FitReport {
        symbol: opts.symbol.clone(),
        provenance,
        keys,
        scale,
        points: closes.len(),
        training_pairs: closes.len() - opts.window_size,
        step: model.bias(),
    };
    info!(
        symbol = %report.symbol,
        %provenance,
        points = report.points,
        pairs = report.training_pairs,
        min = scale.min(),
        max = scale.max(),
        "fit complete"
    );
    Ok(report)
}
