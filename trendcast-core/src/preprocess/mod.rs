//! Preprocessing: window slicing, range validation, min-max scaling, and
//! supervised window construction for the fit stage.

pub mod scale;
pub mod window;

pub use scale::Scale;
pub use window::{check_range, make_windows, validate_and_slice, RangePolicy, Window};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    #[error("at least {required} values are required in 'historico' (got {provided})")]
    InsufficientData { required: usize, provided: usize },

    #[error("value {value} at index {index} is not a finite number")]
    NonFinite { index: usize, value: f64 },

    #[error("value {value} at index {index} is outside the fitted scale range [{min}, {max}]")]
    OutOfRange {
        index: usize,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate scale: min == max == {value}, cannot normalize")]
    DegenerateScale { value: f64 },

    #[error("cannot fit a scale to an empty series")]
    EmptySeries,
}
