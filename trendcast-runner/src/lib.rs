//! TrendCast Runner: the offline pipeline stages.
//!
//! - `collect`: resolve a series through the provider fallback chain, cache
//!   it, persist its provenance, optionally upload both to the artifact store
//! - `fit`: fit the scale and the baseline model on the collected series and
//!   store them under provenance-derived keys

pub mod collect;
pub mod fit;

pub use collect::{default_resolver, run_collect, CollectError, CollectOptions, CollectReport};
pub use fit::{load_series_for_fit, run_fit, FitError, FitOptions, FitReport};
