//! Application configuration (`trendcast.toml`).
//!
//! Every field has a default, so an empty or missing file yields a working
//! local setup. Secrets never live here; they come from the environment.

use crate::data::MAX_LOOKBACK_DAYS;
use crate::preprocess::RangePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "trendcast.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Symbol collected and echoed when a request carries none.
    pub ticker: String,
    pub data: DataConfig,
    pub store: StoreConfig,
    pub model: ModelConfig,
    pub inference: InferenceSettings,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            data: DataConfig::default(),
            store: StoreConfig::default(),
            model: ModelConfig::default(),
            inference: InferenceSettings::default(),
            server: ServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub cache_dir: PathBuf,
    pub provenance_file: PathBuf,
    pub lookback_days: i64,
    pub request_timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("data/cache"),
            provenance_file: PathBuf::from("data/source.txt"),
            lookback_days: 365,
            request_timeout_secs: 30,
        }
    }
}

impl DataConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Local,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Root directory for the local store.
    pub root: PathBuf,
    /// Endpoint for the HTTP store.
    pub base_url: Option<String>,
    pub bucket: String,
    /// Also push the collected series and provenance blob after collection.
    pub upload_series: bool,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Local,
            root: PathBuf::from("artifacts"),
            base_url: None,
            bucket: String::new(),
            upload_series: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub window_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self { window_size: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub range_policy: RangePolicy,
    pub min_history_points: usize,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            range_policy: RangePolicy::Enforce,
            min_history_points: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `trendcast.toml` when present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticker.trim().is_empty() {
            return Err(ConfigError::Invalid("ticker must not be empty".into()));
        }
        if self.model.window_size == 0 {
            return Err(ConfigError::Invalid("model.window_size must be > 0".into()));
        }
        if self.data.lookback_days <= 0 || self.data.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(ConfigError::Invalid(format!(
                "data.lookback_days must be in 1..={MAX_LOOKBACK_DAYS}, got {}",
                self.data.lookback_days
            )));
        }
        if self.inference.min_history_points == 0 {
            return Err(ConfigError::Invalid(
                "inference.min_history_points must be > 0".into(),
            ));
        }
        if self.inference.min_history_points > self.model.window_size {
            return Err(ConfigError::Invalid(format!(
                "inference.min_history_points ({}) exceeds model.window_size ({}); \
                 every history would be labelled insufficient",
                self.inference.min_history_points, self.model.window_size
            )));
        }
        if self.store.kind == StoreKind::Http && self.store.base_url.is_none() {
            return Err(ConfigError::Invalid(
                "store.base_url is required when store.kind = \"http\"".into(),
            ));
        }
        Ok(())
    }
}
