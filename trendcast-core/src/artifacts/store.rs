//! Object-store abstraction with a local filesystem backend.

use super::ArtifactError;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Flat key → bytes store. Keys use `/` separators.
pub trait ArtifactStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Vec<u8>, ArtifactError>;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Store rooted at a local directory.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ArtifactError> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(ArtifactError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl ArtifactStore for LocalStore {
    fn get(&self, key: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ArtifactError::NotFound(key.to_string()))
            }
            Err(e) => Err(ArtifactError::Io(format!("{}: {e}", path.display()))),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ArtifactError::Io(format!("failed to create dir: {e}")))?;
        }
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, bytes).map_err(|e| ArtifactError::Io(format!("write: {e}")))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ArtifactError::Io(format!("atomic rename failed: {e}"))
        })
    }

    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }
}
