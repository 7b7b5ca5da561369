//! Min-max scale fitted once by the fit stage and loaded read-only when serving.

use super::PreprocessError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    min: f64,
    max: f64,
}

impl Scale {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Fit bounds over a reference series.
    pub fn fit(values: &[f64]) -> Result<Self, PreprocessError> {
        if values.is_empty() {
            return Err(PreprocessError::EmptySeries);
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(PreprocessError::NonFinite { index, value });
            }
            min = min.min(value);
            max = max.max(value);
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    fn range(&self) -> Result<f64, PreprocessError> {
        if self.is_degenerate() {
            return Err(PreprocessError::DegenerateScale { value: self.min });
        }
        Ok(self.max - self.min)
    }

    /// `(x - min) / (max - min)` for every value.
    pub fn apply(&self, values: &[f64]) -> Result<Vec<f64>, PreprocessError> {
        let range = self.range()?;
        Ok(values.iter().map(|x| (x - self.min) / range).collect())
    }

    /// `value * (max - min) + min`.
    pub fn invert(&self, value: f64) -> Result<f64, PreprocessError> {
        let range = self.range()?;
        Ok(value * range + self.min)
    }
}
