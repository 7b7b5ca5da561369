//! Trained artifacts: key derivation, storage backends, and the load/save
//! pair used by the fit stage and the server.

pub mod http;
pub mod keys;
pub mod store;

pub use http::HttpObjectStore;
pub use keys::ArtifactKeys;
pub use store::{ArtifactStore, LocalStore};

use crate::config::{StoreConfig, StoreKind};
use crate::domain::Provenance;
use crate::predictor::LinearWindowModel;
use crate::preprocess::Scale;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact '{0}' not found")]
    NotFound(String),

    #[error("invalid artifact key '{0}'")]
    InvalidKey(String),

    #[error("artifact I/O: {0}")]
    Io(String),

    #[error("artifact store HTTP: {0}")]
    Http(String),

    #[error("artifact '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("artifact mismatch: {0}")]
    Mismatch(String),
}

/// Model and scale resolved for one provenance.
#[derive(Debug, Clone)]
pub struct ServingArtifacts {
    pub keys: ArtifactKeys,
    pub model: LinearWindowModel,
    pub scale: Scale,
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, ArtifactError> {
    serde_json::from_slice(bytes).map_err(|e| ArtifactError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn encode<T: serde::Serialize>(key: &str, value: &T) -> Result<Vec<u8>, ArtifactError> {
    serde_json::to_vec_pretty(value).map_err(|e| ArtifactError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Fetch the model/scale pair keyed by `provenance`.
pub fn load_serving_artifacts(
    store: &dyn ArtifactStore,
    provenance: Provenance,
) -> Result<ServingArtifacts, ArtifactError> {
    let keys = ArtifactKeys::for_provenance(provenance);
    info!(store = %store.describe(), model = %keys.model, scale = %keys.scale, "loading artifacts");

    let model: LinearWindowModel = decode(&keys.model, &store.get(&keys.model)?)?;
    let scale: Scale = decode(&keys.scale, &store.get(&keys.scale)?)?;
    if !scale.min().is_finite() || !scale.max().is_finite() || scale.min() > scale.max() {
        return Err(ArtifactError::Corrupt {
            key: keys.scale.clone(),
            reason: format!("invalid bounds [{}, {}]", scale.min(), scale.max()),
        });
    }

    Ok(ServingArtifacts { keys, model, scale })
}

/// Persist a model/scale pair under the keys derived from `provenance`.
pub fn save_model_artifacts(
    store: &dyn ArtifactStore,
    provenance: Provenance,
    model: &LinearWindowModel,
    scale: &Scale,
) -> Result<ArtifactKeys, ArtifactError> {
    let keys = ArtifactKeys::for_provenance(provenance);
    store.put(&keys.model, &encode(&keys.model, model)?)?;
    store.put(&keys.scale, &encode(&keys.scale, scale)?)?;
    info!(store = %store.describe(), model = %keys.model, scale = %keys.scale, "saved artifacts");
    Ok(keys)
}

/// Build the configured store backend.
pub fn open_store(config: &StoreConfig) -> Result<Box<dyn ArtifactStore>, ArtifactError> {
    match config.kind {
        StoreKind::Local => Ok(Box::new(LocalStore::new(config.root.clone()))),
        StoreKind::Http => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                ArtifactError::Http("store.base_url is not configured".to_string())
            })?;
            let store = HttpObjectStore::from_env(
                base_url,
                &config.bucket,
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Box::new(store))
        }
    }
}
