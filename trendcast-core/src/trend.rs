//! Trend classification over observed history and over a single predicted step.
//!
//! Both classifiers share the ±1% direction threshold. They differ in the
//! label for "no significant move": history is `neutro`, a forecast step is
//! `estável`. Boundary values belong to the directional branch.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Percentage change at or beyond which a move counts as directional.
pub const DIRECTION_THRESHOLD_PCT: f64 = 1.0;

/// Coefficient of variation (in %) above which a flat history is volatile.
pub const VOLATILITY_CV_THRESHOLD_PCT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    #[serde(rename = "alta")]
    Rising,
    #[serde(rename = "queda")]
    Falling,
    #[serde(rename = "volátil")]
    Volatile,
    #[serde(rename = "neutro")]
    Neutral,
    #[serde(rename = "estável")]
    Stable,
    #[serde(rename = "insuficientes")]
    Insufficient,
}

impl TrendLabel {
    /// Wire label used in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Rising => "alta",
            TrendLabel::Falling => "queda",
            TrendLabel::Volatile => "volátil",
            TrendLabel::Neutral => "neutro",
            TrendLabel::Stable => "estável",
            TrendLabel::Insufficient => "insuficientes",
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a percentage change, if it crosses the threshold.
fn direction(pct: f64) -> Option<TrendLabel> {
    if pct >= DIRECTION_THRESHOLD_PCT {
        Some(TrendLabel::Rising)
    } else if pct <= -DIRECTION_THRESHOLD_PCT {
        Some(TrendLabel::Falling)
    } else {
        None
    }
}

/// Classify an observed price window.
pub fn classify_history(window: &[f64], min_points: usize) -> TrendLabel {
    if window.is_empty() || window.len() < min_points {
        return TrendLabel::Insufficient;
    }
    let first = window[0];
    let last = window[window.len() - 1];
    if first <= 0.0 {
        return TrendLabel::Volatile;
    }

    let pct = (last - first) / first * 100.0;
    if let Some(label) = direction(pct) {
        return label;
    }

    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return TrendLabel::Volatile;
    }
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean * 100.0;
    if cv > VOLATILITY_CV_THRESHOLD_PCT {
        TrendLabel::Volatile
    } else {
        TrendLabel::Neutral
    }
}

/// Classify a single predicted step against the last observed price.
pub fn classify_forecast(predicted_price: f64, last_price: f64) -> TrendLabel {
    if last_price <= 0.0 {
        return TrendLabel::Volatile;
    }
    let pct = (predicted_price - last_price) / last_price * 100.0;
    direction(pct).unwrap_or(TrendLabel::Stable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn linear(from: f64, to: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| from + (to - from) * i as f64 / (n - 1) as f64)
            .collect()
    }

    #[test]
    fn rising_history() {
        assert_eq!(classify_history(&linear(100.0, 130.0, 30), 30), TrendLabel::Rising);
    }

    #[test]
    fn falling_history() {
        assert_eq!(classify_history(&linear(130.0, 100.0, 30), 30), TrendLabel::Falling);
    }

    #[test]
    fn exact_one_percent_is_rising_not_neutral() {
        let mut window = vec![100.0; 30];
        window[29] = 101.0;
        assert_eq!(classify_history(&window, 30), TrendLabel::Rising);
    }

    #[test]
    fn exact_volatility_threshold_is_neutral_not_volatile() {
        // Mean 100, population std 1.5: cv is exactly 1.5.
        let window = [98.5, 101.5, 101.5, 98.5];
        assert_eq!(classify_history(&window, 4), TrendLabel::Neutral);

        let wider = [98.4, 101.6, 101.6, 98.4];
        assert_eq!(classify_history(&wider, 4), TrendLabel::Volatile);
    }

    #[test]
    fn exact_minus_one_percent_is_falling() {
        let mut window = vec![100.0; 30];
        window[29] = 99.0;
        assert_eq!(classify_history(&window, 30), TrendLabel::Falling);
    }

    #[test]
    fn flat_history_is_neutral() {
        assert_eq!(classify_history(&[100.0; 30], 30), TrendLabel::Neutral);
    }

    #[test]
    fn choppy_flat_endpoints_are_volatile() {
        let window: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 100.0 } else { 110.0 })
            .collect();
        let mut window = window;
        window[29] = 100.0;
        assert_eq!(classify_history(&window, 30), TrendLabel::Volatile);
    }

    #[test]
    fn non_positive_first_is_volatile() {
        let mut window = vec![100.0; 30];
        window[0] = 0.0;
        assert_eq!(classify_history(&window, 30), TrendLabel::Volatile);
    }

    #[test]
    fn too_few_points_is_insufficient() {
        assert_eq!(classify_history(&[100.0; 29], 30), TrendLabel::Insufficient);
        assert_eq!(classify_history(&[], 0), TrendLabel::Insufficient);
    }

    #[test]
    fn forecast_labels() {
        assert_eq!(classify_forecast(101.0, 100.0), TrendLabel::Rising);
        assert_eq!(classify_forecast(99.0, 100.0), TrendLabel::Falling);
        assert_eq!(classify_forecast(100.5, 100.0), TrendLabel::Stable);
        assert_eq!(classify_forecast(100.0, 0.0), TrendLabel::Volatile);
    }

    #[test]
    fn wire_labels() {
        assert_eq!(serde_json::to_string(&TrendLabel::Volatile).unwrap(), "\"volátil\"");
        assert_eq!(TrendLabel::Stable.to_string(), "estável");
    }

    proptest! {
        #[test]
        fn non_positive_first_always_volatile(
            first in -1e3..=0.0_f64,
            rest in prop::collection::vec(-1e3..1e3_f64, 1..60),
        ) {
            let mut window = vec![first];
            window.extend(rest);
            prop_assert_eq!(classify_history(&window, 1), TrendLabel::Volatile);
        }

        #[test]
        fn large_gain_always_rising(
            first in 1.0..1e3_f64,
            gain_pct in 1.0..500.0_f64,
            middle in prop::collection::vec(0.0..1e3_f64, 0..40),
        ) {
            let last = first * (1.0 + gain_pct / 100.0);
            let pct = (last - first) / first * 100.0;
            prop_assume!(pct >= DIRECTION_THRESHOLD_PCT);
            let mut window = vec![first];
            window.extend(middle);
            window.push(last);
            prop_assert_eq!(classify_history(&window, 2), TrendLabel::Rising);
        }
    }
}
