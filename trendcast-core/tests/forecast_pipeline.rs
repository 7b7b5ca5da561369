//! Integration tests: collected series → fitted artifacts → forecast.

use chrono::{Duration, NaiveDate};
use ndarray::Array3;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

use trendcast_core::artifacts::{load_serving_artifacts, save_model_artifacts, LocalStore};
use trendcast_core::data::ParquetCache;
use trendcast_core::domain::{read_provenance, write_provenance, PricePoint, Provenance, Series};
use trendcast_core::inference::{ForecastError, ForecastService, InferenceConfig};
use trendcast_core::predictor::{Concurrency, LinearWindowModel, Predictor, PredictorError};
use trendcast_core::preprocess::{PreprocessError, Scale};
use trendcast_core::trend::TrendLabel;

fn make_series(closes: &[f64]) -> Series {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::new(start + Duration::days(i as i64), c))
        .collect();
    Series::new(points).unwrap()
}

fn rising_30() -> Vec<f64> {
    (0..30).map(|i| 100.0 + i as f64 * 30.0 / 29.0).collect()
}

#[test]
fn fitted_artifacts_serve_matching_provenance() {
    let dir = TempDir::new().unwrap();
    let cache = ParquetCache::new(dir.path().join("cache"));
    let store = LocalStore::new(dir.path().join("artifacts"));
    let provenance_file = dir.path().join("data/source.txt");

    // Collect: a steadily rising year.
    let closes: Vec<f64> = (0..250).map(|i| 90.0 + i as f64 * 0.2).collect();
    cache
        .write("AAPL", &make_series(&closes), Provenance::Secondary)
        .unwrap();
    write_provenance(&provenance_file, Provenance::Secondary).unwrap();

    // Fit.
    let series = cache.load("AAPL").unwrap().closes();
    let scale = Scale::fit(&series).unwrap();
    let normalized = scale.apply(&series).unwrap();
    let model = LinearWindowModel::fit_drift(&normalized, 30).unwrap();
    save_model_artifacts(&store, Provenance::Secondary, &model, &scale).unwrap();

    // Serve.
    let provenance = read_provenance(&provenance_file).unwrap();
    let artifacts = load_serving_artifacts(&store, provenance).unwrap();
    let service = ForecastService::from_artifacts(artifacts, InferenceConfig::default()).unwrap();

    let forecast = service.predict(&closes[closes.len() - 30..]).unwrap();
    assert_eq!(forecast.provenance, Provenance::Secondary);
    assert_eq!(forecast.history_trend, TrendLabel::Rising);
    // Drift of +0.2/day on a ~138 price stays inside ±1%.
    assert_eq!(forecast.forecast_trend, TrendLabel::Stable);
    assert!((forecast.predicted_price - (closes[249] + 0.2)).abs() < 1e-6);

    let response = forecast.to_response("AAPL");
    assert_eq!(response.ultimo_preco, format!("US$ {:.2}", closes[249]));
}

#[test]
fn rising_history_with_prediction_below_last_is_falling() {
    // Negative drift of 0.6 normalized units on a width-50 scale: -30 dollars.
    let model = LinearWindowModel::drift(30, -0.6).unwrap();
    let service = ForecastService::new(
        Box::new(model),
        Scale::new(90.0, 140.0),
        Provenance::Primary,
        InferenceConfig::default(),
    )
    .unwrap();

    let forecast = service.predict(&rising_30()).unwrap();
    assert_eq!(forecast.history_trend, TrendLabel::Rising);
    assert_eq!(forecast.forecast_trend, TrendLabel::Falling);
    assert!(forecast.predicted_price < forecast.last_price);
}

#[test]
fn twenty_nine_values_name_the_required_thirty() {
    let service = ForecastService::new(
        Box::new(LinearWindowModel::persistence(30).unwrap()),
        Scale::new(0.0, 200.0),
        Provenance::Primary,
        InferenceConfig::default(),
    )
    .unwrap();

    let err = service.predict(&[100.0; 29]).unwrap_err();
    assert!(err.is_client_error());
    assert!(matches!(
        err,
        ForecastError::Preprocess(PreprocessError::InsufficientData {
            required: 30,
            provided: 29
        })
    ));
    assert!(err.to_string().contains("30"));
}

#[test]
fn longer_history_uses_trailing_window() {
    let service = ForecastService::new(
        Box::new(LinearWindowModel::persistence(30).unwrap()),
        Scale::new(0.0, 200.0),
        Provenance::Primary,
        InferenceConfig::default(),
    )
    .unwrap();

    // Leading junk outside the window is never inspected.
    let mut history = vec![-1000.0, f64::NAN];
    history.extend(rising_30());
    let forecast = service.predict(&history).unwrap();
    assert!((forecast.last_price - 130.0).abs() < 1e-9);
}

// ── Exclusive predictors ─────────────────────────────────────────────

/// Records the peak number of overlapping `predict` calls.
struct Tracking {
    in_flight: AtomicUsize,
    peak: Arc<AtomicUsize>,
}

impl Predictor for Tracking {
    fn name(&self) -> &str {
        "tracking"
    }

    fn input_size(&self) -> usize {
        30
    }

    fn concurrency(&self) -> Concurrency {
        Concurrency::Exclusive
    }

    fn predict(&self, _input: &Array3<f64>) -> Result<f64, PredictorError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(5));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(0.5)
    }
}

#[test]
fn exclusive_predictor_is_never_called_concurrently() {
    let peak = Arc::new(AtomicUsize::new(0));
    let predictor = Tracking {
        in_flight: AtomicUsize::new(0),
        peak: Arc::clone(&peak),
    };
    let service = Arc::new(
        ForecastService::new(
            Box::new(predictor),
            Scale::new(0.0, 200.0),
            Provenance::Primary,
            InferenceConfig::default(),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..4 {
                    service.predict(&[100.0; 30]).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
}
