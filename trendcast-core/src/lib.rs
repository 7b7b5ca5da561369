//! TrendCast Core: source resolution, preprocessing, trend classification,
//! artifacts, and inference.
//!
//! - Domain types (price series, provenance)
//! - Ordered provider fallback chain ending in a synthetic placeholder
//! - Parquet series cache
//! - Window slicing, range validation and min-max scaling
//! - History and forecast trend classifiers
//! - Provenance-keyed artifact store (local or HTTP)
//! - Predictor seam and the forecast orchestrator

pub mod artifacts;
pub mod config;
pub mod data;
pub mod domain;
pub mod inference;
pub mod predictor;
pub mod preprocess;
pub mod trend;
