//! Collect → fit → serve, with scripted providers standing in for the network.

use chrono::{Duration, NaiveDate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use trendcast_core::artifacts::{load_serving_artifacts, ArtifactKeys, ArtifactStore, LocalStore};
use trendcast_core::data::{
    AttemptOutcome, DataProvider, FetchResult, ParquetCache, SourceError, SourceResolver,
};
use trendcast_core::domain::{read_provenance, PricePoint, Provenance, Series};
use trendcast_core::inference::{ForecastService, InferenceConfig};
use trendcast_runner::{run_collect, run_fit, CollectOptions, FitError, FitOptions};

struct Scripted {
    name: &'static str,
    closes: Option<Vec<f64>>,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn ok(name: &'static str, closes: Vec<f64>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                closes: Some(closes),
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    fn failing(name: &'static str) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                name,
                closes: None,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl DataProvider for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<FetchResult, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let closes = self
            .closes
            .as_ref()
            .ok_or_else(|| SourceError::NetworkUnreachable("scripted failure".into()))?;
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PricePoint::new(start + Duration::days(i as i64), c))
            .collect();
        Ok(FetchResult {
            symbol: symbol.to_string(),
            series: Series::new(points)?,
        })
    }
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

fn year_of_closes() -> Vec<f64> {
    (0..250).map(|i| 150.0 + (i as f64 * 0.05).sin() * 5.0 + i as f64 * 0.1).collect()
}

struct Workspace {
    _dir: TempDir,
    cache: ParquetCache,
    store: LocalStore,
    provenance_file: std::path::PathBuf,
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    Workspace {
        cache: ParquetCache::new(dir.path().join("cache")),
        store: LocalStore::new(dir.path().join("artifacts")),
        provenance_file: dir.path().join("data/source.txt"),
        _dir: dir,
    }
}

fn collect_opts(ws: &Workspace, upload: bool) -> CollectOptions {
    CollectOptions {
        symbol: "AAPL".to_string(),
        provenance_file: ws.provenance_file.clone(),
        upload,
    }
}

fn fit_opts(ws: &Workspace, allow_synthetic: bool, window_size: usize) -> FitOptions {
    FitOptions {
        symbol: "AAPL".to_string(),
        window_size,
        provenance_file: ws.provenance_file.clone(),
        allow_synthetic,
    }
}

#[test]
fn primary_success_flows_through_to_serving() {
    let ws = workspace();
    let (primary, primary_calls) = Scripted::ok("primary", year_of_closes());
    let (secondary, secondary_calls) = Scripted::ok("secondary", year_of_closes());
    let resolver = SourceResolver::new(as_of())
        .with_source(Provenance::Primary, Box::new(primary))
        .with_source(Provenance::Secondary, Box::new(secondary));

    let report = run_collect(&resolver, &ws.cache, None, &collect_opts(&ws, false)).unwrap();
    assert_eq!(report.provenance, Provenance::Primary);
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
    assert!(!report.uploaded);
    assert_eq!(read_provenance(&ws.provenance_file).unwrap(), Provenance::Primary);

    let fit = run_fit(&ws.cache, &ws.store, &fit_opts(&ws, false, 30)).unwrap();
    assert_eq!(fit.keys, ArtifactKeys::for_provenance(Provenance::Primary));
    assert_eq!(fit.points, 250);
    assert_eq!(fit.training_pairs, 220);

    let artifacts = load_serving_artifacts(&ws.store, Provenance::Primary).unwrap();
    let service = ForecastService::from_artifacts(artifacts, InferenceConfig::default()).unwrap();
    let closes = year_of_closes();
    let forecast = service.predict(&closes[200..]).unwrap();
    assert_eq!(forecast.provenance, Provenance::Primary);
    assert!(forecast.predicted_price.is_finite());
}

#[test]
fn secondary_fallback_keys_artifacts_by_secondary() {
    let ws = workspace();
    let (primary, primary_calls) = Scripted::failing("primary");
    let (secondary, secondary_calls) = Scripted::ok("secondary", year_of_closes());
    let resolver = SourceResolver::new(as_of())
        .with_source(Provenance::Primary, Box::new(primary))
        .with_source(Provenance::Secondary, Box::new(secondary));

    let report = run_collect(&resolver, &ws.cache, None, &collect_opts(&ws, false)).unwrap();
    assert_eq!(report.provenance, Provenance::Secondary);
    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(secondary_calls.load(Ordering::SeqCst), 1);
    assert!(matches!(report.attempts[0].outcome, AttemptOutcome::Failed(_)));

    run_fit(&ws.cache, &ws.store, &fit_opts(&ws, false, 30)).unwrap();
    assert!(load_serving_artifacts(&ws.store, Provenance::Secondary).is_ok());
    assert!(load_serving_artifacts(&ws.store, Provenance::Primary).is_err());
}

#[test]
fn synthetic_fallback_is_refused_by_fit_unless_allowed() {
    let ws = workspace();
    let (primary, _) = Scripted::failing("primary");
    let (secondary, _) = Scripted::failing("secondary");
    let resolver = SourceResolver::new(as_of())
        .with_source(Provenance::Primary, Box::new(primary))
        .with_source(Provenance::Secondary, Box::new(secondary));

    let report = run_collect(&resolver, &ws.cache, None, &collect_opts(&ws, false)).unwrap();
    assert_eq!(report.provenance, Provenance::Synthetic);
    assert!(report.meta.point_count > 0);

    let err = run_fit(&ws.cache, &ws.store, &fit_opts(&ws, false, 30)).unwrap_err();
    assert!(matches!(err, FitError::SyntheticRefused { .. }));

    // Allowed, but the placeholder is shorter than a 30-point window.
    let err = run_fit(&ws.cache, &ws.store, &fit_opts(&ws, true, 30)).unwrap_err();
    assert!(matches!(err, FitError::InsufficientHistory { points: 10, .. }));

    // A small window fits on the placeholder.
    let fit = run_fit(&ws.cache, &ws.store, &fit_opts(&ws, true, 5)).unwrap();
    assert_eq!(fit.provenance, Provenance::Synthetic);
    assert_eq!(fit.keys.model, "models/model_lstm_synthetic.json");
}

#[test]
fn upload_pushes_series_and_provenance() {
    let ws = workspace();
    let (primary, _) = Scripted::ok("primary", year_of_closes());
    let resolver = SourceResolver::new(as_of()).with_source(Provenance::Primary, Box::new(primary));

    let store: &dyn ArtifactStore = &ws.store;
    let report = run_collect(&resolver, &ws.cache, Some(store), &collect_opts(&ws, true)).unwrap();
    assert!(report.uploaded);
    assert_eq!(ws.store.get("data/source.txt").unwrap(), b"primary\n");
    assert!(ws.store.get(&ArtifactKeys::series("AAPL")).is_ok());
}

#[test]
fn fit_falls_back_to_store_when_cache_is_empty() {
    let ws = workspace();
    let (primary, _) = Scripted::ok("primary", year_of_closes());
    let resolver = SourceResolver::new(as_of()).with_source(Provenance::Primary, Box::new(primary));
    let store: &dyn ArtifactStore = &ws.store;
    run_collect(&resolver, &ws.cache, Some(store), &collect_opts(&ws, true)).unwrap();

    // Fresh cache directory and no local provenance file: both come from the store.
    let dir = TempDir::new().unwrap();
    let empty_cache = ParquetCache::new(dir.path().join("cache"));
    let opts = FitOptions {
        provenance_file: dir.path().join("missing/source.txt"),
        ..fit_opts(&ws, false, 30)
    };
    let fit = run_fit(&empty_cache, &ws.store, &opts).unwrap();
    assert_eq!(fit.provenance, Provenance::Primary);
    assert_eq!(fit.points, 250);
}

#[test]
fn fit_without_any_series_fails() {
    let ws = workspace();
    std::fs::create_dir_all(ws.provenance_file.parent().unwrap()).unwrap();
    std::fs::write(&ws.provenance_file, "primary\n").unwrap();

    let err = run_fit(&ws.cache, &ws.store, &fit_opts(&ws, false, 30)).unwrap_err();
    assert!(matches!(err, FitError::Artifact(_)));
}
