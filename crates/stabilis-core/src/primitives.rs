//! # Innate Primitives
//!
//! Hardcoded constants shared between ingestion, encoding and persistence.
//!
//! Anything that changes the shape of a feature vector or the layout of a
//! persisted model lives here. Changing one of these values invalidates
//! every previously trained model.

/// Number of standard amino-acid residues.
pub const AMINO_ACID_COUNT: usize = 20;

/// Number of DSSP secondary-structure classes.
pub const STRUCTURE_CLASS_COUNT: usize = 7;

/// Width of the leading (old residue, new residue) one-hot block.
pub const MUTATION_BLOCK_WIDTH: usize = 2 * AMINO_ACID_COUNT;

/// Width contributed by one neighbour offset of a window group
/// (previous residue half + next residue half).
pub const WINDOW_SLOT_WIDTH: usize = 2 * AMINO_ACID_COUNT;

/// Window width used by the default feature set.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Sentinel for "absent" in raw window and structure columns.
pub const ABSENT_SENTINEL: &str = "-";

// =============================================================================
// COLUMN AND FEATURE KEYS
// =============================================================================

/// Protein identifier column (identity metadata, never a feature).
pub const PROTEIN_COLUMN: &str = "protein";

/// Chain identifier column (identity metadata, never a feature).
pub const CHAIN_COLUMN: &str = "chain";

/// Mutation descriptor column, e.g. `A123G`.
pub const MUTATION_COLUMN: &str = "mutation";

/// Measured ΔΔG column, present only in training/evaluation data.
pub const GROUND_TRUTH_KEY: &str = "realddg";

/// Secondary-structure column and feature group name.
pub const STRUCTURE_KEY: &str = "struc";

/// Wild-type residue code key in numeric records.
pub const OLD_AA_KEY: &str = "oldAA";

/// Mutant residue code key in numeric records.
pub const NEW_AA_KEY: &str = "newAA";

/// Prefix of preceding-neighbour keys (`prevAA1`, `prevAA2`, ...).
pub const PREV_AA_PREFIX: &str = "prevAA";

/// Prefix of following-neighbour keys (`nextAA1`, `nextAA2`, ...).
pub const NEXT_AA_PREFIX: &str = "nextAA";

/// Prefix of window feature groups (`windowAA10`).
pub const WINDOW_GROUP_PREFIX: &str = "windowAA";

/// Spatial-neighbour frequency group name; per-residue keys are
/// `3D_freq_<letter>`.
pub const SPATIAL_FREQUENCY_KEY: &str = "3D_freq";

// =============================================================================
// SPECIALIST OUTPUT RANGES
// =============================================================================

/// Output range of stabilizing specialists (ΔΔG < 0).
pub const STABILIZING_RANGE: (f64, f64) = (-11.0, 0.0);

/// Output range of destabilizing specialists (ΔΔG > 0).
pub const DESTABILIZING_RANGE: (f64, f64) = (0.0, 31.0);

/// Number of specialists averaged per record during regression fusion.
pub const SPECIALISTS_PER_POLARITY: usize = 2;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Magic bytes for the Stabilis model artifact header.
pub const MAGIC_BYTES: &[u8; 4] = b"STBL";

/// Current artifact format version.
///
/// Increment this when making breaking changes to a learner's layout.
pub const FORMAT_VERSION: u8 = 1;

/// Header length: magic bytes + version byte.
pub const HEADER_SIZE: usize = 5;

/// Maximum accepted artifact size (256 MB).
pub const MAX_ARTIFACT_SIZE: usize = 256 * 1024 * 1024;
