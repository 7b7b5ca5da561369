//! Daily closing-price series.
//!
//! A `Series` can only be built through [`Series::new`], which enforces the
//! two invariants every downstream stage relies on: dates strictly
//! increasing and closes finite.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One observation: the closing price on a trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("dates not strictly increasing at index {index}: {previous} then {current}")]
    NotIncreasing {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("non-finite close {value} on {date}")]
    NonFinite { date: NaiveDate, value: f64 },
}

/// Ordered, validated sequence of closing prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    points: Vec<PricePoint>,
}

impl Series {
    /// Validate and wrap a list of points.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        for (i, point) in points.iter().enumerate() {
            if !point.close.is_finite() {
                return Err(SeriesError::NonFinite {
                    date: point.date,
                    value: point.close,
                });
            }
            if i > 0 && points[i - 1].date >= point.date {
                return Err(SeriesError::NotIncreasing {
                    index: i,
                    previous: points[i - 1].date,
                    current: point.date,
                });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices in date order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// BLAKE3 over dates and closes, used in cache metadata.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for point in &self.points {
            hasher.update(point.date.to_string().as_bytes());
            hasher.update(&point.close.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl<'de> Deserialize<'de> for Series {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            points: Vec<PricePoint>,
        }
        let raw = Raw::deserialize(deserializer)?;
        Series::new(raw.points).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn accepts_increasing_finite_points() {
        let series = Series::new(vec![
            PricePoint::new(day(2), 100.0),
            PricePoint::new(day(3), 101.5),
        ])
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![100.0, 101.5]);
        assert_eq!(series.first_date(), Some(day(2)));
        assert_eq!(series.last_date(), Some(day(3)));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let err = Series::new(vec![
            PricePoint::new(day(2), 100.0),
            PricePoint::new(day(2), 101.0),
        ])
        .unwrap_err();
        assert!(matches!(err, SeriesError::NotIncreasing { index: 1, .. }));
    }

    #[test]
    fn rejects_nan_close() {
        let err = Series::new(vec![PricePoint::new(day(2), f64::NAN)]).unwrap_err();
        assert!(matches!(err, SeriesError::NonFinite { .. }));
    }

    #[test]
    fn hash_changes_with_content() {
        let a = Series::new(vec![PricePoint::new(day(2), 100.0)]).unwrap();
        let b = Series::new(vec![PricePoint::new(day(2), 100.5)]).unwrap();
        assert_ne!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash(), a.clone().content_hash());
    }

    #[test]
    fn deserialize_revalidates() {
        let json = r#"{"points":[{"date":"2024-01-03","close":1.0},{"date":"2024-01-02","close":2.0}]}"#;
        assert!(serde_json::from_str::<Series>(json).is_err());
    }
}
