//! # Predictor Contract
//!
//! What the ensemble needs from a roster member, independent of the
//! learning algorithm behind it.
//!
//! ## Lifecycle
//!
//! ```text
//! init(Train) ─► train(records) ─► run(...)      (persists on train)
//! init(Load)  ─► run(...)                        (ModelNotFound if absent)
//! ```
//!
//! The output kind is part of the type: a [`PredictorHandle`] is either a
//! classification or a regression member, so asking a classifier for
//! ΔΔG values cannot be expressed.

mod classification;
mod regression;

pub use classification::{
    ClassificationLearner, ForestClassifier, LearnedClassifier, NetworkClassifier, SvmClassifier,
    VoterParams,
};
pub use regression::NetworkRegressor;

use crate::encoder::FeatureSet;
use crate::formats::{artifact_from_bytes, artifact_to_bytes};
use crate::record::NumericRecord;
use crate::rescale::DomainRange;
use crate::storage::ArtifactStore;
use crate::system::CancellationToken;
use crate::{Stability, StabilisError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Algorithm family of a roster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PredictorKind {
    Svm,
    RandomForest,
    NeuralNetwork,
    NeuralNetworkRegression,
}

impl PredictorKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Svm => "svm",
            Self::RandomForest => "random-forest",
            Self::NeuralNetwork => "neural-network",
            Self::NeuralNetworkRegression => "neural-network-regression",
        }
    }
}

/// Stable identifier of a roster member; doubles as its artifact key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PredictorId {
    pub kind: PredictorKind,
    /// Position among members of the same kind.
    pub ordinal: usize,
}

impl PredictorId {
    #[must_use]
    pub const fn new(kind: PredictorKind, ordinal: usize) -> Self {
        Self { kind, ordinal }
    }

    /// Seed for this member's random source: FNV-1a of the identifier
    /// mixed into the run seed.
    #[must_use]
    pub fn seed(&self, base: u64) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0100_0000_01b3;
        let hash = self
            .to_string()
            .bytes()
            .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
        base ^ hash
    }
}

impl std::fmt::Display for PredictorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.kind.name(), self.ordinal)
    }
}

/// How a member is prepared for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Discard any model state; `train` follows.
    Train,
    /// Restore the persisted model.
    Load,
}

// =============================================================================
// TRAITS
// =============================================================================

/// Operations shared by every roster member.
pub trait Predictor: Send + Sync {
    fn id(&self) -> PredictorId;

    /// Feature groups this member encodes its input with.
    fn feature_set(&self) -> &FeatureSet;

    fn is_trained(&self) -> bool;

    /// Reset (`Train`) or restore from `store` (`Load`).
    fn init(&mut self, mode: InitMode, store: &dyn ArtifactStore) -> Result<(), StabilisError> {
        match mode {
            InitMode::Train => {
                self.reset();
                Ok(())
            }
            InitMode::Load => self.load(store),
        }
    }

    /// Drop the in-memory model.
    fn reset(&mut self);

    /// Fit from `records` and persist the result to `store`.
    ///
    /// Prior state is discarded first; records are never modified.
    fn train(
        &mut self,
        records: &[NumericRecord],
        store: &dyn ArtifactStore,
        cancel: &CancellationToken,
    ) -> Result<(), StabilisError>;

    fn save(&self, store: &dyn ArtifactStore) -> Result<(), StabilisError>;

    fn load(&mut self, store: &dyn ArtifactStore) -> Result<(), StabilisError>;
}

/// A member that emits a stability label per record.
pub trait Classifier: Predictor {
    fn run(&self, records: &[NumericRecord]) -> Result<Vec<Stability>, StabilisError>;
}

/// A member that emits ΔΔG for the records of one polarity.
pub trait Regressor: Predictor {
    /// Which side of ΔΔG this specialist models.
    fn polarity(&self) -> Stability;

    /// The ΔΔG interval the outputs are mapped into.
    fn output_range(&self) -> DomainRange;

    /// ΔΔG per record, `0.0` wherever `labels[i] != polarity()`.
    fn run(
        &self,
        records: &[NumericRecord],
        labels: &[Stability],
    ) -> Result<Vec<f64>, StabilisError>;
}

// =============================================================================
// HANDLE
// =============================================================================

/// A roster member, tagged by output kind.
pub enum PredictorHandle {
    Classification(Box<dyn Classifier>),
    Regression(Box<dyn Regressor>),
}

impl std::fmt::Debug for PredictorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classification(p) => write!(f, "Classification({})", p.id()),
            Self::Regression(p) => write!(f, "Regression({}, {})", p.id(), p.polarity()),
        }
    }
}

impl PredictorHandle {
    #[must_use]
    pub fn id(&self) -> PredictorId {
        match self {
            Self::Classification(p) => p.id(),
            Self::Regression(p) => p.id(),
        }
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        match self {
            Self::Classification(p) => p.is_trained(),
            Self::Regression(p) => p.is_trained(),
        }
    }

    #[must_use]
    pub fn as_classifier(&self) -> Option<&dyn Classifier> {
        match self {
            Self::Classification(p) => Some(p.as_ref()),
            Self::Regression(_) => None,
        }
    }

    #[must_use]
    pub fn as_regressor(&self) -> Option<&dyn Regressor> {
        match self {
            Self::Classification(_) => None,
            Self::Regression(p) => Some(p.as_ref()),
        }
    }

    pub fn init(&mut self, mode: InitMode, store: &dyn ArtifactStore) -> Result<(), StabilisError> {
        match self {
            Self::Classification(p) => p.init(mode, store),
            Self::Regression(p) => p.init(mode, store),
        }
    }

    pub fn train(
        &mut self,
        records: &[NumericRecord],
        store: &dyn ArtifactStore,
        cancel: &CancellationToken,
    ) -> Result<(), StabilisError> {
        match self {
            Self::Classification(p) => p.train(records, store, cancel),
            Self::Regression(p) => p.train(records, store, cancel),
        }
    }
}

// =============================================================================
// PERSISTED MODEL
// =============================================================================

/// What is written to the artifact store: the feature contract the model
/// was trained with, plus the learner state.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedModel<M> {
    feature_set: FeatureSet,
    model: M,
}

/// Save `model` under `id`, tagged with `feature_set`.
fn save_model<M: Serialize>(
    store: &dyn ArtifactStore,
    id: PredictorId,
    feature_set: &FeatureSet,
    model: &M,
) -> Result<(), StabilisError> {
    #[derive(Serialize)]
    struct Borrowed<'a, M> {
        feature_set: &'a FeatureSet,
        model: &'a M,
    }
    let bytes = artifact_to_bytes(&Borrowed { feature_set, model })?;
    store.save(&id.to_string(), &bytes)
}

/// Load the model saved under `id`, rejecting a feature-contract mismatch.
fn load_model<M: DeserializeOwned>(
    store: &dyn ArtifactStore,
    id: PredictorId,
    feature_set: &FeatureSet,
) -> Result<M, StabilisError> {
    let bytes = store.load(&id.to_string())?;
    let persisted: PersistedModel<M> = artifact_from_bytes(&bytes)?;
    if &persisted.feature_set != feature_set {
        return Err(StabilisError::InvalidEncoding(format!(
            "artifact for {} was trained with a different feature set",
            id
        )));
    }
    Ok(persisted.model)
}

// =============================================================================
// TESTS
// =============================================================================
