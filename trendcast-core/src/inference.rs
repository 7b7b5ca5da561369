//! Inference orchestration: one history in, one formatted forecast out.
//!
//! Steps, each short-circuiting with its own error:
//! slice → range check → history trend → normalize + predict → invert →
//! forecast trend → response.

use crate::artifacts::{ArtifactError, ServingArtifacts};
use crate::config::AppConfig;
use crate::domain::Provenance;
use crate::predictor::{Concurrency, Predictor, PredictorError};
use crate::preprocess::{check_range, validate_and_slice, PreprocessError, RangePolicy, Scale};
use crate::trend::{classify_forecast, classify_history, TrendLabel};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error("artifact load failed: {0}")]
    ArtifactLoad(#[from] ArtifactError),

    #[error("invalid inference config: {0}")]
    InvalidConfig(String),
}

impl ForecastError {
    /// Errors caused by the request payload rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::Preprocess(
                PreprocessError::InsufficientData { .. }
                    | PreprocessError::NonFinite { .. }
                    | PreprocessError::OutOfRange { .. }
            )
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceConfig {
    pub window_size: usize,
    pub range_policy: RangePolicy,
    /// Minimum points for a history trend other than `insuficientes`.
    pub min_history_points: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            window_size: 30,
            range_policy: RangePolicy::Enforce,
            min_history_points: 30,
        }
    }
}

impl From<&AppConfig> for InferenceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            window_size: config.model.window_size,
            range_policy: config.inference.range_policy,
            min_history_points: config.inference.min_history_points,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub last_price: f64,
    pub predicted_price: f64,
    pub history_trend: TrendLabel,
    pub forecast_trend: TrendLabel,
    pub provenance: Provenance,
    pub window_size: usize,
}

/// Wire response of the forecast endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub ticker: String,
    pub ultimo_preco: String,
    pub preco_previsto: String,
    pub tendencia: TrendLabel,
    pub tendencia_prevista: TrendLabel,
    pub fonte_dados: Provenance,
    pub explicacao: String,
}

pub fn format_usd(value: f64) -> String {
    format!("US$ {value:.2}")
}

impl Forecast {
    pub fn to_response(&self, ticker: &str) -> ForecastResponse {
        ForecastResponse {
            ticker: ticker.to_string(),
            ultimo_preco: format_usd(self.last_price),
            preco_previsto: format_usd(self.predicted_price),
            tendencia: self.history_trend,
            tendencia_prevista: self.forecast_trend,
            fonte_dados: self.provenance,
            explicacao: format!(
                "Para o ticker '{ticker}', usamos os últimos {} valores para estimar o \
                 próximo preço. Tendência histórica '{}', tendência prevista '{}' \
                 (dados: {}).",
                self.window_size, self.history_trend, self.forecast_trend, self.provenance
            ),
        }
    }
}

/// Loaded predictor + scale, shared read-only across requests.
pub struct ForecastService {
    predictor: Box<dyn Predictor>,
    scale: Scale,
    provenance: Provenance,
    config: InferenceConfig,
    gate: Option<Mutex<()>>,
}

impl ForecastService {
    pub fn new(
        predictor: Box<dyn Predictor>,
        scale: Scale,
        provenance: Provenance,
        config: InferenceConfig,
    ) -> Result<Self, ForecastError> {
        // classify_history only ever sees the window.
        if config.min_history_points == 0 || config.min_history_points > config.window_size {
            return Err(ForecastError::InvalidConfig(format!(
                "min_history_points must be in 1..={}, got {}",
                config.window_size, config.min_history_points
            )));
        }
        if predictor.input_size() != config.window_size {
            return Err(ArtifactError::Mismatch(format!(
                "predictor '{}' expects {} steps but window_size is {}",
                predictor.name(),
                predictor.input_size(),
                config.window_size
            ))
            .into());
        }
        let gate = match predictor.concurrency() {
            Concurrency::Exclusive => Some(Mutex::new(())),
            Concurrency::Reentrant => None,
        };
        Ok(Self {
            predictor,
            scale,
            provenance,
            config,
            gate,
        })
    }

    pub fn from_artifacts(
        artifacts: ServingArtifacts,
        config: InferenceConfig,
    ) -> Result<Self, ForecastError> {
        Self::new(
            Box::new(artifacts.model),
            artifacts.scale,
            artifacts.keys.provenance,
            config,
        )
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn predict(&self, history: &[f64]) -> Result<Forecast, ForecastError> {
        let window = validate_and_slice(history, self.config.window_size)?;
        if self.config.range_policy == RangePolicy::Enforce {
            check_range(&window, &self.scale)?;
        }
        let history_trend = classify_history(window.values(), self.config.min_history_points);

        let normalized = self.scale.apply(window.values())?;
        let input = Array3::from_shape_vec((1, window.len(), 1), normalized)
            .map_err(|e| PredictorError::Failed(format!("reshape: {e}")))?;
        let output = self.invoke(&input)?;
        if !output.is_finite() {
            return Err(PredictorError::NonFiniteOutput(output).into());
        }

        let predicted_price = self.scale.invert(output)?;
        let last_price = window
            .last()
            .ok_or(PreprocessError::InsufficientData {
                required: self.config.window_size,
                provided: 0,
            })?;
        let forecast_trend = classify_forecast(predicted_price, last_price);
        debug!(
            predictor = self.predictor.name(),
            last_price,
            predicted_price,
            %history_trend,
            %forecast_trend,
            "forecast"
        );

        Ok(Forecast {
            last_price,
            predicted_price,
            history_trend,
            forecast_trend,
            provenance: self.provenance,
            window_size: self.config.window_size,
        })
    }

    fn invoke(&self, input: &Array3<f64>) -> Result<f64, PredictorError> {
        match &self.gate {
            Some(gate) => {
                let _guard = gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                self.predictor.predict(input)
            }
            None => self.predictor.predict(input),
        }
    }
}
