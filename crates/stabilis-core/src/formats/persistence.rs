//! # Artifact Envelope
//!
//! Format: header (5 bytes) + postcard-serialized model state.
//! - 4 bytes: magic (`STBL`)
//! - 1 byte: format version
//!
//! The size limit and the header are validated before the payload is
//! handed to postcard, so a truncated or foreign file fails fast.

use crate::StabilisError;
use crate::primitives::{FORMAT_VERSION, HEADER_SIZE, MAGIC_BYTES, MAX_ARTIFACT_SIZE};
use serde::Serialize;
use serde::de::DeserializeOwned;

// =============================================================================
// HEADER
// =============================================================================

/// The header preceding every artifact payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl ArtifactHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    /// Reject foreign magic bytes and unknown versions.
    pub fn validate(&self) -> Result<(), StabilisError> {
        if &self.magic != MAGIC_BYTES {
            return Err(StabilisError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(StabilisError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StabilisError> {
        if bytes.len() < HEADER_SIZE {
            return Err(StabilisError::Serialization(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for ArtifactHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize model state into an artifact (header + payload).
pub fn artifact_to_bytes<T: Serialize>(state: &T) -> Result<Vec<u8>, StabilisError> {
    let payload =
        postcard::to_stdvec(state).map_err(|e| StabilisError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&ArtifactHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserialize model state from an artifact.
///
/// Checks, in order: minimum size, maximum size, header. Only then is
/// the payload decoded.
pub fn artifact_from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StabilisError> {
    if bytes.len() < HEADER_SIZE {
        return Err(StabilisError::Serialization(format!(
            "Data too short: minimum {} bytes required",
            HEADER_SIZE
        )));
    }
    if bytes.len() > MAX_ARTIFACT_SIZE {
        return Err(StabilisError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_ARTIFACT_SIZE
        )));
    }

    ArtifactHeader::from_bytes(bytes)?.validate()?;

    postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        StabilisError::Serialization(format!("Failed to deserialize artifact: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================
