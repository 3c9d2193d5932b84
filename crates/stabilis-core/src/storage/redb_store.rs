//! # redb-backed Artifact Storage
//!
//! All artifacts of a model set in one redb database file: ACID writes,
//! concurrent readers, crash safety from copy-on-write B-trees.

use super::artifact::ArtifactStore;
use crate::StabilisError;
use redb::{Database, ReadableDatabase, TableDefinition};
use std::path::Path;

/// Table for artifacts: predictor id -> envelope bytes
const ARTIFACTS: TableDefinition<&str, &[u8]> = TableDefinition::new("artifacts");

fn io_error(e: impl std::fmt::Display) -> StabilisError {
    StabilisError::Io(e.to_string())
}

/// A disk-backed artifact store using redb.
pub struct RedbArtifactStore {
    db: Database,
}

impl std::fmt::Debug for RedbArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbArtifactStore").finish_non_exhaustive()
    }
}

impl RedbArtifactStore {
    /// Open or create an artifact database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StabilisError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;

        // Create the table up front so read transactions never miss it
        {
            let write_txn = db.begin_write().map_err(io_error)?;
            let _ = write_txn.open_table(ARTIFACTS).map_err(io_error)?;
            write_txn.commit().map_err(io_error)?;
        }

        Ok(Self { db })
    }
}

impl ArtifactStore for RedbArtifactStore {
    fn save(&self, id: &str, bytes: &[u8]) -> Result<(), StabilisError> {
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(ARTIFACTS).map_err(io_error)?;
            table.insert(id, bytes).map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)?;
        tracing::debug!(id, bytes = bytes.len(), "artifact committed");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Vec<u8>, StabilisError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(ARTIFACTS).map_err(io_error)?;
        let entry = table.get(id).map_err(io_error)?;
        entry
            .map(|guard| guard.value().to_vec())
            .ok_or_else(|| StabilisError::ModelNotFound(id.to_string()))
    }

    fn contains(&self, id: &str) -> Result<bool, StabilisError> {
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(ARTIFACTS).map_err(io_error)?;
        Ok(table.get(id).map_err(io_error)?.is_some())
    }
}

// =============================================================================
// TESTS
// =============================================================================
