//! # Core Type Definitions
//!
//! This module contains the vocabulary shared by every layer of Stabilis:
//! - Residue and structure codes (`AminoAcid`, `SecondaryStructure`)
//! - The stability label (`Stability`), also used as specialist polarity
//! - Error types (`StabilisError`)
//!
//! ## Code Conventions
//!
//! Residue and structure codes are 1-indexed. Code `0` is reserved for
//! "absent" (no neighbour, no structure assignment) and is never a valid
//! enum value; it only exists in numeric records.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// AMINO ACIDS
// =============================================================================

/// The 20 standard amino-acid residues in canonical order.
///
/// Discriminants are the numeric codes used by numeric records (1..=20).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AminoAcid {
    A = 1,
    R,
    N,
    D,
    C,
    E,
    Q,
    G,
    H,
    I,
    L,
    K,
    F,
    M,
    P,
    S,
    T,
    W,
    Y,
    V,
}

impl AminoAcid {
    /// All residues in canonical (code) order.
    pub const ALL: [AminoAcid; 20] = [
        AminoAcid::A,
        AminoAcid::R,
        AminoAcid::N,
        AminoAcid::D,
        AminoAcid::C,
        AminoAcid::E,
        AminoAcid::Q,
        AminoAcid::G,
        AminoAcid::H,
        AminoAcid::I,
        AminoAcid::L,
        AminoAcid::K,
        AminoAcid::F,
        AminoAcid::M,
        AminoAcid::P,
        AminoAcid::S,
        AminoAcid::T,
        AminoAcid::W,
        AminoAcid::Y,
        AminoAcid::V,
    ];

    /// Numeric code (1..=20).
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parse a one-letter residue symbol.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|aa| aa.letter() == letter)
    }

    /// Resolve a numeric code; `0` and anything above 20 yield `None`.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1..=20 => Some(Self::ALL[usize::from(code) - 1]),
            _ => None,
        }
    }

    /// One-letter residue symbol.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            AminoAcid::A => 'A',
            AminoAcid::R => 'R',
            AminoAcid::N => 'N',
            AminoAcid::D => 'D',
            AminoAcid::C => 'C',
            AminoAcid::E => 'E',
            AminoAcid::Q => 'Q',
            AminoAcid::G => 'G',
            AminoAcid::H => 'H',
            AminoAcid::I => 'I',
            AminoAcid::L => 'L',
            AminoAcid::K => 'K',
            AminoAcid::F => 'F',
            AminoAcid::M => 'M',
            AminoAcid::P => 'P',
            AminoAcid::S => 'S',
            AminoAcid::T => 'T',
            AminoAcid::W => 'W',
            AminoAcid::Y => 'Y',
            AminoAcid::V => 'V',
        }
    }
}

impl std::fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// =============================================================================
// SECONDARY STRUCTURE
// =============================================================================

/// DSSP secondary-structure classes, codes 1..=7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SecondaryStructure {
    /// `H`: α-helix
    AlphaHelix = 1,
    /// `B`: isolated β-bridge
    BetaBridge,
    /// `E`: extended β-strand
    BetaStrand,
    /// `G`: 3-10 helix
    ThreeHelix,
    /// `I`: π-helix
    PiHelix,
    /// `T`: hydrogen bonded turn
    Turn,
    /// `S`: bend
    Bend,
}

impl SecondaryStructure {
    /// All classes in code order.
    pub const ALL: [SecondaryStructure; 7] = [
        SecondaryStructure::AlphaHelix,
        SecondaryStructure::BetaBridge,
        SecondaryStructure::BetaStrand,
        SecondaryStructure::ThreeHelix,
        SecondaryStructure::PiHelix,
        SecondaryStructure::Turn,
        SecondaryStructure::Bend,
    ];

    /// Numeric code (1..=7).
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parse a DSSP letter.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'H' => Some(Self::AlphaHelix),
            'B' => Some(Self::BetaBridge),
            'E' => Some(Self::BetaStrand),
            'G' => Some(Self::ThreeHelix),
            'I' => Some(Self::PiHelix),
            'T' => Some(Self::Turn),
            'S' => Some(Self::Bend),
            _ => None,
        }
    }
}

// =============================================================================
// STABILITY LABEL
// =============================================================================

/// Effect of a mutation on protein stability.
///
/// Doubles as the polarity of a regression specialist: a `Stabilizing`
/// specialist models ΔΔG < 0, a `Destabilizing` one models ΔΔG > 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Stability {
    /// Label 0 (ΔΔG ≥ 0).
    #[default]
    Destabilizing = 0,
    /// Label 1 (ΔΔG < 0).
    Stabilizing = 1,
}

impl Stability {
    /// Derive the ground-truth label from a measured ΔΔG.
    #[must_use]
    pub fn from_ddg(ddg: f64) -> Self {
        if ddg < 0.0 {
            Self::Stabilizing
        } else {
            Self::Destabilizing
        }
    }

    /// Integer label (0 or 1).
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Build from a boolean "is stabilizing" decision.
    #[must_use]
    pub const fn from_bool(stabilizing: bool) -> Self {
        if stabilizing {
            Self::Stabilizing
        } else {
            Self::Destabilizing
        }
    }

    /// Classification target used by learners (0.0 or 1.0).
    #[must_use]
    pub fn target(self) -> f64 {
        f64::from(self.as_u8())
    }
}

impl std::fmt::Display for Stability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stability::Destabilizing => write!(f, "destabilizing"),
            Stability::Stabilizing => write!(f, "stabilizing"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Stabilis system.
///
/// - No silent failures: every error aborts the enclosing run
/// - Use `Result<T, StabilisError>` for fallible operations
/// - The core never panics
#[derive(Debug, Error)]
pub enum StabilisError {
    /// Raw data could not be parsed or has the wrong arity.
    #[error("Malformed input at record {record}, column '{column}': {reason}")]
    MalformedInput {
        record: usize,
        column: String,
        reason: String,
    },

    /// An operation was called in the wrong lifecycle phase.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A value cannot be placed into a one-hot or window block.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A requested feature key is absent from a numeric record.
    #[error("Missing feature '{key}' in record {record}")]
    MissingFeature { record: usize, key: String },

    /// Training or evaluation needs `realddg`, which is absent.
    #[error("Missing ground truth in record {record}")]
    MissingGroundTruth { record: usize },

    /// No persisted model exists for a predictor.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Filtering left a predictor with nothing to learn from.
    #[error("Empty training set for {0}")]
    EmptyTrainingSet(String),

    /// A learner could not fit its model.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// The roster composition breaks a fusion assumption.
    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    /// The run was cancelled through its cancellation token.
    #[error("Run cancelled")]
    Cancelled,

    /// A roster member failed during a pipeline stage.
    #[error("{stage} failed for {member}: {source}")]
    MemberFailed {
        stage: String,
        member: String,
        #[source]
        source: Box<StabilisError>,
    },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl StabilisError {
    /// Shorthand for a malformed-input error.
    pub fn malformed(record: usize, column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            record,
            column: column.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
