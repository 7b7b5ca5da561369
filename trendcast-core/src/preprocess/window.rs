//! Fixed-size windows over price history.

use super::{PreprocessError, Scale};
use serde::{Deserialize, Serialize};

/// Whether incoming windows are checked against the fitted scale range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    #[default]
    Enforce,
    Off,
}

/// Trailing slice of a history, remembering where it started.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    values: Vec<f64>,
    offset: usize,
}

impl Window {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Index of the first window element inside the original history.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Take exactly the last `window_size` values of `history`, in order.
pub fn validate_and_slice(history: &[f64], window_size: usize) -> Result<Window, PreprocessError> {
    if history.len() < window_size {
        return Err(PreprocessError::InsufficientData {
            required: window_size,
            provided: history.len(),
        });
    }
    let offset = history.len() - window_size;
    let values = history[offset..].to_vec();
    if let Some((i, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(PreprocessError::NonFinite {
            index: offset + i,
            value,
        });
    }
    Ok(Window { values, offset })
}

/// Reject windows containing values the fitted scale never saw.
///
/// The reported index refers to the caller's original history.
pub fn check_range(window: &Window, scale: &Scale) -> Result<(), PreprocessError> {
    for (i, &value) in window.values.iter().enumerate() {
        if !scale.contains(value) {
            return Err(PreprocessError::OutOfRange {
                index: window.offset + i,
                value,
                min: scale.min(),
                max: scale.max(),
            });
        }
    }
    Ok(())
}

/// Supervised pairs for one-step-ahead training: input
/// `values[i - look_back..i]`, target `values[i]`, for every
/// `i in look_back..values.len()`.
pub fn make_windows(values: &[f64], look_back: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
    if look_back == 0 || values.len() <= look_back {
        return (Vec::new(), Vec::new());
    }
    (look_back..values.len())
        .map(|i| (values[i - look_back..i].to_vec(), values[i]))
        .unzip()
}
