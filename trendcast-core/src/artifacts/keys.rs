//! Artifact key derivation.
//!
//! The fit stage writes and the server reads through the same function, so a
//! model trained on one feed can never be served against another feed's scale.

use crate::domain::Provenance;

/// Key of the persisted provenance blob.
pub const PROVENANCE_KEY: &str = "data/source.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactKeys {
    pub provenance: Provenance,
    pub model: String,
    pub scale: String,
}

impl ArtifactKeys {
    pub fn for_provenance(provenance: Provenance) -> Self {
        Self {
            provenance,
            model: format!("models/model_lstm_{provenance}.json"),
            scale: format!("models/scaler_{provenance}.json"),
        }
    }

    /// Key of the collected close series for a symbol.
    pub fn series(symbol: &str) -> String {
        format!("series/{}_close.parquet", symbol.to_uppercase())
    }

    pub fn provenance_key() -> &'static str {
        PROVENANCE_KEY
    }
}
