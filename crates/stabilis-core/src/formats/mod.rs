//! # Formats Module
//!
//! Binary envelope for persisted model artifacts. File and database I/O
//! live in [`crate::storage`].

mod persistence;

pub use persistence::{ArtifactHeader, artifact_from_bytes, artifact_to_bytes};
