//! Deterministic placeholder series, the last resort of the fallback chain.
//!
//! Clearly fake: closes follow the point index. Anything built from it is
//! tagged `synthetic` and the fit stage refuses it unless told otherwise.

use crate::domain::{PricePoint, Series};
use chrono::{Duration, NaiveDate};

/// Number of points in the placeholder series.
pub const SYNTHETIC_LEN: usize = 10;

/// Build the placeholder: `SYNTHETIC_LEN` consecutive days ending at `as_of`,
/// closes `0, 1, ..., SYNTHETIC_LEN - 1`.
pub fn placeholder_series(as_of: NaiveDate) -> Series {
    let first = as_of - Duration::days(SYNTHETIC_LEN as i64 - 1);
    let points: Vec<PricePoint> = (0..SYNTHETIC_LEN)
        .map(|i| PricePoint::new(first + Duration::days(i as i64), i as f64))
        .collect();
    // Consecutive days and integral closes satisfy the series invariants.
    match Series::new(points) {
        Ok(series) => series,
        Err(e) => unreachable!("placeholder series violates invariants: {e}"),
    }
}
