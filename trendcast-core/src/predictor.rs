//! Predictor seam.
//!
//! A predictor maps one normalized window shaped `(1, window_size, 1)` to a
//! single normalized next-step value. The bundled implementation is a linear
//! window model persisted as JSON; other backends plug in through the trait.

use crate::preprocess::make_windows;
use ndarray::{Array3, ArrayView1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    #[error("input shape {got:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },

    #[error("predictor produced a non-finite output ({0})")]
    NonFiniteOutput(f64),

    #[error("predictor failed: {0}")]
    Failed(String),
}

/// Whether a predictor tolerates concurrent `predict` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    #[default]
    Reentrant,
    /// Calls must be serialized by the caller.
    Exclusive,
}

pub trait Predictor: Send + Sync {
    fn name(&self) -> &str;

    /// Number of time steps the predictor expects per window.
    fn input_size(&self) -> usize;

    fn concurrency(&self) -> Concurrency {
        Concurrency::Reentrant
    }

    fn predict(&self, input: &Array3<f64>) -> Result<f64, PredictorError>;
}

/// Shape check shared by implementations.
pub fn expect_shape(input: &Array3<f64>, steps: usize) -> Result<(), PredictorError> {
    let (b, s, f) = input.dim();
    if (b, s, f) != (1, steps, 1) {
        return Err(PredictorError::ShapeMismatch {
            expected: (1, steps, 1),
            got: (b, s, f),
        });
    }
    Ok(())
}

// ── Linear window model ──

#[derive(Deserialize)]
struct RawLinearModel {
    window_size: usize,
    weights: Vec<f64>,
    bias: f64,
}

/// `y = weights · window + bias` over a normalized window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLinearModel")]
pub struct LinearWindowModel {
    window_size: usize,
    weights: Vec<f64>,
    bias: f64,
}

impl TryFrom<RawLinearModel> for LinearWindowModel {
    type Error = PredictorError;

    fn try_from(raw: RawLinearModel) -> Result<Self, Self::Error> {
        if raw.window_size == 0 || raw.weights.len() != raw.window_size {
            return Err(PredictorError::Failed(format!(
                "model declares window_size {} but has {} weights",
                raw.window_size,
                raw.weights.len()
            )));
        }
        if !raw.bias.is_finite() || raw.weights.iter().any(|w| !w.is_finite()) {
            return Err(PredictorError::Failed(
                "model parameters must be finite".to_string(),
            ));
        }
        Ok(Self {
            window_size: raw.window_size,
            weights: raw.weights,
            bias: raw.bias,
        })
    }
}

impl LinearWindowModel {
    pub fn new(weights: Vec<f64>, bias: f64) -> Result<Self, PredictorError> {
        Self::try_from(RawLinearModel {
            window_size: weights.len(),
            weights,
            bias,
        })
    }

    /// Predicts the last observed value unchanged.
    pub fn persistence(window_size: usize) -> Result<Self, PredictorError> {
        Self::drift(window_size, 0.0)
    }

    /// Last observed value plus a constant step.
    pub fn drift(window_size: usize, step: f64) -> Result<Self, PredictorError> {
        let mut weights = vec![0.0; window_size];
        if let Some(last) = weights.last_mut() {
            *last = 1.0;
        }
        Self::new(weights, step)
    }

    /// Drift baseline fitted on a normalized series: the step is the mean
    /// one-step change between each window's last value and its target.
    pub fn fit_drift(normalized: &[f64], window_size: usize) -> Result<Self, PredictorError> {
        let (inputs, targets) = make_windows(normalized, window_size);
        if inputs.is_empty() {
            return Err(PredictorError::Failed(format!(
                "need more than {window_size} points to fit, got {}",
                normalized.len()
            )));
        }
        let total: f64 = inputs
            .iter()
            .zip(&targets)
            .map(|(x, y)| y - x[x.len() - 1])
            .sum();
        Self::drift(window_size, total / inputs.len() as f64)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl Predictor for LinearWindowModel {
    fn name(&self) -> &str {
        "linear-window"
    }

    fn input_size(&self) -> usize {
        self.window_size
    }

    fn predict(&self, input: &Array3<f64>) -> Result<f64, PredictorError> {
        expect_shape(input, self.window_size)?;
        let steps = input.index_axis(ndarray::Axis(0), 0);
        let column = steps.index_axis(ndarray::Axis(1), 0);
        let out = column.dot(&ArrayView1::from(&self.weights[..])) + self.bias;
        if !out.is_finite() {
            return Err(PredictorError::NonFiniteOutput(out));
        }
        Ok(out)
    }
}
