//! # stabilis-core
//!
//! Feature encoding and ensemble orchestration for predicting how a single
//! amino-acid substitution changes protein stability (ΔΔG).
//!
//! ## Pipeline
//!
//! ```text
//! CSV ─► RecordStore::ingest ─► transform (+ rescale) ─► encode per member
//!     ─► classifiers ─► majority vote ─► class-gated regressors ─► pair average
//! ```
//!
//! ## Architectural Constraints
//!
//! - Encoding is bit-for-bit identical between training and inference
//! - Deterministic: ordered maps, seeded randomness, roster-order reporting
//! - No async, no network: the binary owns I/O policy and signals
//! - Numeric records are immutable after `transform`; fused labels travel
//!   beside them, never inside them

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod encoder;
pub mod ensemble;
pub mod evaluation;
pub mod formats;
pub mod learners;
pub mod predictor;
pub mod primitives;
pub mod record;
pub mod rescale;
pub mod storage;
pub mod system;
pub mod transform;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{AminoAcid, SecondaryStructure, StabilisError, Stability};

// =============================================================================
// RE-EXPORTS: Records and Encoding
// =============================================================================

pub use encoder::{FeatureGroup, FeatureSet, FeatureVector, encode};
pub use record::{NumericRecord, RawRecord, RecordIdentity, RecordStore};
pub use rescale::DomainRange;

// =============================================================================
// RE-EXPORTS: Predictors and Ensemble
// =============================================================================

pub use config::PipelineConfig;
pub use ensemble::{EnsemblePipeline, Prediction, Roster, RunMode};
pub use evaluation::{ConfusionMatrix, EvaluationReport};
pub use predictor::{
    Classifier, InitMode, Predictor, PredictorHandle, PredictorId, PredictorKind, Regressor,
};

// =============================================================================
// RE-EXPORTS: Storage and System
// =============================================================================

pub use storage::{ArtifactStore, DirectoryArtifactStore, MemoryArtifactStore, RedbArtifactStore};
pub use system::{CancellationToken, Phase};
