//! # Artifact Storage
//!
//! Where trained models live between runs. Every store maps a predictor
//! identifier (`svm-0`, `neural-network-regression-3`, ...) to the bytes
//! produced by [`crate::formats::artifact_to_bytes`].
//!
//! ## Backends
//!
//! - `MemoryArtifactStore`: volatile, for tests and single-process runs
//! - `DirectoryArtifactStore`: one `<id>.model` file per predictor
//! - `RedbArtifactStore`: a single redb database with an `artifacts` table

mod artifact;
mod redb_store;

pub use artifact::{ArtifactStore, DirectoryArtifactStore, MemoryArtifactStore};
pub use redb_store::RedbArtifactStore;
