//! Parquet cache for collected series.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/series.parquet` plus a `meta.json`
//! sidecar recording date range, point count, content hash and provenance.
//!
//! Writes are atomic (write to .tmp, rename into place). Loads validate the
//! schema and re-check the series invariants.

use crate::domain::{PricePoint, Provenance, Series, SeriesError};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SERIES_FILE: &str = "series.parquet";
const META_FILE: &str = "meta.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cached data for symbol '{symbol}' (run `trendcast collect {symbol}` first)")]
    NoCachedData { symbol: String },

    #[error("cannot cache an empty series for '{symbol}'")]
    EmptySeries { symbol: String },

    #[error("cache I/O: {0}")]
    Io(String),

    #[error("parquet: {0}")]
    Parquet(String),

    #[error("cached series is invalid: {0}")]
    Invalid(#[from] SeriesError),
}

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub point_count: usize,
    pub data_hash: String,
    pub provenance: Provenance,
    pub cached_at: chrono::NaiveDateTime,
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    /// Path of the Parquet file for a symbol.
    pub fn series_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(SERIES_FILE)
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join(META_FILE)
    }

    /// Write a series and its metadata sidecar.
    pub fn write(
        &self,
        symbol: &str,
        series: &Series,
        provenance: Provenance,
    ) -> Result<CacheMeta, CacheError> {
        let (Some(start_date), Some(end_date)) = (series.first_date(), series.last_date()) else {
            return Err(CacheError::EmptySeries {
                symbol: symbol.to_string(),
            });
        };

        let sym_dir = self.symbol_dir(symbol);
        fs::create_dir_all(&sym_dir)
            .map_err(|e| CacheError::Io(format!("failed to create dir: {e}")))?;

        let bytes = series_to_parquet(series)?;
        let path = self.series_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");
        fs::write(&tmp_path, &bytes).map_err(|e| CacheError::Io(format!("write: {e}")))?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            CacheError::Io(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date,
            end_date,
            point_count: series.len(),
            data_hash: series.content_hash(),
            provenance,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| CacheError::Io(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| CacheError::Io(format!("meta write: {e}")))?;

        Ok(meta)
    }

    /// Load the cached series for a symbol.
    pub fn load(&self, symbol: &str) -> Result<Series, CacheError> {
        let path = self.series_path(symbol);
        if !path.exists() {
            return Err(CacheError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }
        let bytes = fs::read(&path).map_err(|e| CacheError::Io(format!("read: {e}")))?;
        series_from_parquet(&bytes)
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Metadata for every cached symbol, sorted by symbol.
    pub fn list(&self) -> Result<Vec<CacheMeta>, CacheError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let entries =
            fs::read_dir(&self.cache_dir).map_err(|e| CacheError::Io(format!("read dir: {e}")))?;

        let mut metas = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io(format!("dir entry: {e}")))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(symbol) = name.strip_prefix("symbol=") {
                if let Some(meta) = self.get_meta(symbol) {
                    metas.push(meta);
                }
            }
        }
        metas.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(metas)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Encode a series as Parquet bytes (columns `date`, `close`).
pub fn series_to_parquet(series: &Series) -> Result<Vec<u8>, CacheError> {
    let epoch = NaiveDate::default();
    let dates: Vec<i32> = series
        .points()
        .iter()
        .map(|p| (p.date - epoch).num_days() as i32)
        .collect();
    let closes: Vec<f64> = series.closes();

    let mut df = DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| CacheError::Parquet(format!("date cast: {e}")))?,
        Column::new("close".into(), closes),
    ])
    .map_err(|e| CacheError::Parquet(format!("dataframe creation: {e}")))?;

    let mut buf = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df)
        .map_err(|e| CacheError::Parquet(format!("write parquet: {e}")))?;
    Ok(buf)
}

/// Decode Parquet bytes produced by [`series_to_parquet`].
pub fn series_from_parquet(bytes: &[u8]) -> Result<Series, CacheError> {
    let df = ParquetReader::new(Cursor::new(bytes))
        .finish()
        .map_err(|e| CacheError::Parquet(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(CacheError::Parquet("empty parquet file".into()));
    }

    let map_err = |e: PolarsError| CacheError::Parquet(format!("column read: {e}"));
    let date_ca = df
        .column("date")
        .map_err(map_err)?
        .date()
        .map_err(|e| CacheError::Parquet(format!("date column type: {e}")))?
        .clone();
    let close_ca = df
        .column("close")
        .map_err(map_err)?
        .f64()
        .map_err(|e| CacheError::Parquet(format!("close column type: {e}")))?
        .clone();

    let epoch = NaiveDate::default();
    let mut points = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| CacheError::Parquet(format!("null date at row {i}")))?;
        let close = close_ca
            .get(i)
            .ok_or_else(|| CacheError::Parquet(format!("null close at row {i}")))?;
        points.push(PricePoint::new(
            epoch + chrono::Duration::days(days as i64),
            close,
        ));
    }

    Ok(Series::new(points)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> Series {
        Series::new(vec![
            PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 185.64),
            PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(), 184.25),
            PricePoint::new(NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(), 181.91),
        ])
        .unwrap()
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());

        cache.write("AAPL", &sample_series(), Provenance::Primary).unwrap();
        let loaded = cache.load("AAPL").unwrap();

        assert_eq!(loaded, sample_series());
    }

    #[test]
    fn meta_records_provenance_and_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());

        cache.write("AAPL", &sample_series(), Provenance::Secondary).unwrap();
        let meta = cache.get_meta("AAPL").unwrap();

        assert_eq!(meta.provenance, Provenance::Secondary);
        assert_eq!(meta.point_count, 3);
        assert_eq!(meta.start_date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(meta.end_date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(meta.data_hash, sample_series().content_hash());
    }

    #[test]
    fn load_missing_symbol_is_no_cached_data() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        assert!(matches!(
            cache.load("MSFT"),
            Err(CacheError::NoCachedData { .. })
        ));
    }

    #[test]
    fn empty_series_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let empty = Series::new(Vec::new()).unwrap();
        assert!(matches!(
            cache.write("AAPL", &empty, Provenance::Primary),
            Err(CacheError::EmptySeries { .. })
        ));
    }

    #[test]
    fn list_is_sorted_by_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("MSFT", &sample_series(), Provenance::Primary).unwrap();
        cache.write("AAPL", &sample_series(), Provenance::Primary).unwrap();

        let symbols: Vec<String> = cache.list().unwrap().into_iter().map(|m| m.symbol).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        assert!(series_from_parquet(b"not parquet").is_err());
    }
}
