//! Provenance: which data source produced a collected series.
//!
//! Written once by the collection stage as a single-line text file and read
//! by the fit and serving stages to locate the matching model/scale pair.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Primary,
    Secondary,
    Synthetic,
}

impl Provenance {
    pub const ALL: [Provenance; 3] = [
        Provenance::Primary,
        Provenance::Secondary,
        Provenance::Synthetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Primary => "primary",
            Provenance::Secondary => "secondary",
            Provenance::Synthetic => "synthetic",
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Provenance::Synthetic)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("unknown provenance '{0}' (expected primary, secondary or synthetic)")]
    Unknown(String),

    #[error("provenance file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FromStr for Provenance {
    type Err = ProvenanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "primary" => Ok(Provenance::Primary),
            "secondary" => Ok(Provenance::Secondary),
            "synthetic" => Ok(Provenance::Synthetic),
            other => Err(ProvenanceError::Unknown(other.to_string())),
        }
    }
}

/// Write the provenance label as a single line, creating parent directories.
pub fn write_provenance(path: &Path, provenance: Provenance) -> Result<(), ProvenanceError> {
    let io_err = |source| ProvenanceError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    fs::write(path, format!("{provenance}\n")).map_err(io_err)
}

pub fn read_provenance(path: &Path) -> Result<Provenance, ProvenanceError> {
    let content = fs::read_to_string(path).map_err(|source| ProvenanceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    content.parse()
}
