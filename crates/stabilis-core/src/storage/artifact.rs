//! The artifact store contract plus the memory and directory backends.

use crate::StabilisError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// File extension of artifacts in a [`DirectoryArtifactStore`].
const ARTIFACT_EXTENSION: &str = "model";

/// Keyed byte storage for trained models.
///
/// Stores take `&self` so one store can be shared by roster members
/// training on different worker threads.
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes` under `id`, replacing any previous artifact.
    fn save(&self, id: &str, bytes: &[u8]) -> Result<(), StabilisError>;

    /// Fetch the artifact stored under `id`.
    ///
    /// Fails with `ModelNotFound` if nothing was saved under `id`.
    fn load(&self, id: &str) -> Result<Vec<u8>, StabilisError>;

    /// Check whether an artifact exists under `id`.
    fn contains(&self, id: &str) -> Result<bool, StabilisError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Volatile in-process store.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryArtifactStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> Result<usize, StabilisError> {
        Ok(self.read()?.len())
    }

    /// Check if the store holds no artifact.
    pub fn is_empty(&self) -> Result<bool, StabilisError> {
        Ok(self.read()?.is_empty())
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>, StabilisError> {
        self.artifacts
            .read()
            .map_err(|_| StabilisError::Io("artifact store lock poisoned".to_string()))
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn save(&self, id: &str, bytes: &[u8]) -> Result<(), StabilisError> {
        let mut artifacts = self
            .artifacts
            .write()
            .map_err(|_| StabilisError::Io("artifact store lock poisoned".to_string()))?;
        artifacts.insert(id.to_string(), bytes.to_vec());
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Vec<u8>, StabilisError> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| StabilisError::ModelNotFound(id.to_string()))
    }

    fn contains(&self, id: &str) -> Result<bool, StabilisError> {
        Ok(self.read()?.contains_key(id))
    }
}

// =============================================================================
// DIRECTORY STORE
// =============================================================================

/// One file per predictor under a model directory.
#[derive(Debug, Clone)]
pub struct DirectoryArtifactStore {
    root: PathBuf,
}

impl DirectoryArtifactStore {
    /// Open (and create if needed) a model directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StabilisError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| {
            StabilisError::Io(format!("cannot create {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    /// The model directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for `id`.
    ///
    /// Identifiers are restricted to a single path component.
    pub fn path_of(&self, id: &str) -> Result<PathBuf, StabilisError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StabilisError::InvalidState(format!(
                "'{}' is not a valid artifact identifier",
                id
            )));
        }
        Ok(self.root.join(format!("{}.{}", id, ARTIFACT_EXTENSION)))
    }
}

impl ArtifactStore for DirectoryArtifactStore {
    fn save(&self, id: &str, bytes: &[u8]) -> Result<(), StabilisError> {
        let path = self.path_of(id)?;
        std::fs::write(&path, bytes)
            .map_err(|e| StabilisError::Io(format!("cannot write {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Vec<u8>, StabilisError> {
        let path = self.path_of(id)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StabilisError::ModelNotFound(id.to_string()))
            }
            Err(e) => Err(StabilisError::Io(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn contains(&self, id: &str) -> Result<bool, StabilisError> {
        Ok(self.path_of(id)?.is_file())
    }
}

// =============================================================================
// TESTS
// =============================================================================
