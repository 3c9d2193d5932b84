//! Classification members: one generic wrapper over the three learners.

use super::{Classifier, Predictor, PredictorId, load_model, save_model};
use crate::config::PipelineConfig;
use crate::encoder::{self, FeatureSet};
use crate::learners::{
    ForestParams, LeastSquaresSvm, Network, NetworkParams, RandomForest, SvmParams,
};
use crate::record::{NumericRecord, expected_classification};
use crate::storage::ArtifactStore;
use crate::system::CancellationToken;
use crate::{Stability, StabilisError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A learner that maps feature vectors to stability labels.
pub trait ClassificationLearner: Serialize + DeserializeOwned + Send + Sync + Sized {
    type Params: Send + Sync;

    fn fit(
        samples: &[Vec<f64>],
        labels: &[Stability],
        params: &Self::Params,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<Self, StabilisError>;

    fn predict(&self, input: &[f64]) -> Result<Stability, StabilisError>;

    /// Consistency check of a restored model.
    fn validate(&self) -> Result<(), StabilisError>;
}

/// Perceptron voter settings. Training stops at the smaller of the
/// absolute target and `target_per_sample` per training sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoterParams {
    pub network: NetworkParams,
    pub target_per_sample: f64,
}

impl VoterParams {
    /// Stopping rule for a training set of `samples` vectors.
    #[must_use]
    pub fn for_samples(&self, samples: usize) -> NetworkParams {
        NetworkParams {
            target_error: self
                .network
                .target_error
                .min(samples as f64 * self.target_per_sample),
            ..self.network
        }
    }
}

impl ClassificationLearner for LeastSquaresSvm {
    type Params = SvmParams;

    fn fit(
        samples: &[Vec<f64>],
        labels: &[Stability],
        params: &SvmParams,
        _rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<Self, StabilisError> {
        LeastSquaresSvm::train(samples, labels, params, cancel)
    }

    fn predict(&self, input: &[f64]) -> Result<Stability, StabilisError> {
        self.classify(input)
    }

    fn validate(&self) -> Result<(), StabilisError> {
        LeastSquaresSvm::validate(self)
    }
}

impl ClassificationLearner for RandomForest {
    type Params = ForestParams;

    fn fit(
        samples: &[Vec<f64>],
        labels: &[Stability],
        params: &ForestParams,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<Self, StabilisError> {
        RandomForest::train(samples, labels, params, rng, cancel)
    }

    fn predict(&self, input: &[f64]) -> Result<Stability, StabilisError> {
        self.classify(input)
    }

    fn validate(&self) -> Result<(), StabilisError> {
        RandomForest::validate(self)
    }
}

impl ClassificationLearner for Network {
    type Params = VoterParams;

    fn fit(
        samples: &[Vec<f64>],
        labels: &[Stability],
        params: &VoterParams,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<Self, StabilisError> {
        let targets: Vec<f64> = labels.iter().map(|l| l.target()).collect();
        let params = params.for_samples(samples.len());
        let (network, _) = Network::train(samples, &targets, &params, rng, cancel)?;
        Ok(network)
    }

    fn predict(&self, input: &[f64]) -> Result<Stability, StabilisError> {
        Ok(Stability::from_bool(self.compute(input)? > 0.5))
    }

    fn validate(&self) -> Result<(), StabilisError> {
        Network::validate(self)
    }
}

// =============================================================================
// GENERIC CLASSIFIER
// =============================================================================

/// A classification roster member backed by learner `L`.
pub struct LearnedClassifier<L: ClassificationLearner> {
    id: PredictorId,
    feature_set: FeatureSet,
    params: L::Params,
    seed: u64,
    model: Option<L>,
}

pub type SvmClassifier = LearnedClassifier<LeastSquaresSvm>;
pub type ForestClassifier = LearnedClassifier<RandomForest>;
pub type NetworkClassifier = LearnedClassifier<Network>;

impl<L: ClassificationLearner> LearnedClassifier<L> {
    #[must_use]
    pub fn with_params(
        id: PredictorId,
        feature_set: FeatureSet,
        params: L::Params,
        seed: u64,
    ) -> Self {
        Self {
            id,
            feature_set,
            params,
            seed: id.seed(seed),
            model: None,
        }
    }
}

impl SvmClassifier {
    #[must_use]
    pub fn new(id: PredictorId, feature_set: FeatureSet, config: &PipelineConfig) -> Self {
        let params = SvmParams {
            weight_ratio: config.svm.weight_ratio,
            kernel_estimation_samples: config.svm.kernel_estimation_samples,
        };
        Self::with_params(id, feature_set, params, config.seed)
    }
}

impl ForestClassifier {
    #[must_use]
    pub fn new(id: PredictorId, feature_set: FeatureSet, config: &PipelineConfig) -> Self {
        let params = ForestParams {
            trees: config.forest.trees,
            max_depth: config.forest.max_depth,
            min_samples_split: config.forest.min_samples_split,
        };
        Self::with_params(id, feature_set, params, config.seed)
    }
}

impl NetworkClassifier {
    #[must_use]
    pub fn new(id: PredictorId, feature_set: FeatureSet, config: &PipelineConfig) -> Self {
        let params = VoterParams {
            network: NetworkParams {
                hidden: config.network.classifier_hidden,
                target_error: config.network.classifier_target_error,
                max_epochs: config.network.max_epochs,
            },
            target_per_sample: config.network.classifier_target_per_sample,
        };
        Self::with_params(id, feature_set, params, config.seed)
    }
}

impl<L: ClassificationLearner> Predictor for LearnedClassifier<L> {
    fn id(&self) -> PredictorId {
        self.id
    }

    fn feature_set(&self) -> &FeatureSet {
        &self.feature_set
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    fn reset(&mut self) {
        self.model = None;
    }

    fn train(
        &mut self,
        records: &[NumericRecord],
        store: &dyn ArtifactStore,
        cancel: &CancellationToken,
    ) -> Result<(), StabilisError> {
        self.reset();
        if records.is_empty() {
            return Err(StabilisError::EmptyTrainingSet(self.id.to_string()));
        }

        let labels = expected_classification(records)?;
        let samples = encoder::encode(records, &self.feature_set)?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        tracing::debug!(member = %self.id, samples = samples.len(), "training classifier");
        self.model = Some(L::fit(&samples, &labels, &self.params, &mut rng, cancel)?);
        self.save(store)
    }

    fn save(&self, store: &dyn ArtifactStore) -> Result<(), StabilisError> {
        let model = self.model.as_ref().ok_or_else(|| {
            StabilisError::InvalidState(format!("{} has no model to save", self.id))
        })?;
        save_model(store, self.id, &self.feature_set, model)
    }

    fn load(&mut self, store: &dyn ArtifactStore) -> Result<(), StabilisError> {
        self.model = None;
        let model: L = load_model(store, self.id, &self.feature_set)?;
        model.validate()?;
        self.model = Some(model);
        Ok(())
    }
}

impl<L: ClassificationLearner> Classifier for LearnedClassifier<L> {
    fn run(&self, records: &[NumericRecord]) -> Result<Vec<Stability>, StabilisError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| StabilisError::ModelNotFound(self.id.to_string()))?;
        encoder::encode(records, &self.feature_set)?
            .iter()
            .map(|vector| model.predict(vector))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::FeatureGroup;
    use crate::predictor::{InitMode, PredictorKind};
    use crate::storage::MemoryArtifactStore;

    fn record(old: f64, new: f64, x: f64, ddg: f64) -> NumericRecord {
        [("oldAA", old), ("newAA", new), ("x", x), ("realddg", ddg)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn records() -> Vec<NumericRecord> {
        vec![
            record(1.0, 2.0, 0.0, -1.0),
            record(1.0, 2.0, 0.1, -2.0),
            record(3.0, 4.0, 0.9, 1.0),
            record(3.0, 4.0, 1.0, 2.0),
        ]
    }

    fn feature_set() -> FeatureSet {
        FeatureSet::new(vec![FeatureGroup::Scalar("x".into())])
    }

    #[test]
    fn run_before_train_is_model_not_found() {
        let svm = SvmClassifier::new(
            PredictorId::new(PredictorKind::Svm, 0),
            feature_set(),
            &PipelineConfig::default(),
        );
        assert!(matches!(
            svm.run(&records()),
            Err(StabilisError::ModelNotFound(_))
        ));
    }

    #[test]
    fn train_persists_and_load_restores() {
        let store = MemoryArtifactStore::new();
        let config = PipelineConfig::default();
        let id = PredictorId::new(PredictorKind::Svm, 0);

        let mut trained = SvmClassifier::new(id, feature_set(), &config);
        trained
            .train(&records(), &store, &CancellationToken::new())
            .expect("train");
        assert!(store.contains("svm-0").expect("contains"));

        let mut restored = SvmClassifier::new(id, feature_set(), &config);
        restored.init(InitMode::Load, &store).expect("load");
        assert_eq!(
            restored.run(&records()).expect("run"),
            trained.run(&records()).expect("run")
        );
        assert_eq!(
            trained.run(&records()).expect("run"),
            vec![
                Stability::Stabilizing,
                Stability::Stabilizing,
                Stability::Destabilizing,
                Stability::Destabilizing
            ]
        );
    }

    #[test]
    fn load_missing_is_model_not_found() {
        let store = MemoryArtifactStore::new();
        let mut forest = ForestClassifier::new(
            PredictorId::new(PredictorKind::RandomForest, 0),
            feature_set(),
            &PipelineConfig::default(),
        );
        assert!(matches!(
            forest.init(InitMode::Load, &store),
            Err(StabilisError::ModelNotFound(_))
        ));
    }

    #[test]
    fn feature_set_mismatch_is_rejected_on_load() {
        let store = MemoryArtifactStore::new();
        let config = PipelineConfig::default();
        let id = PredictorId::new(PredictorKind::Svm, 0);
        SvmClassifier::new(id, feature_set(), &config)
            .train(&records(), &store, &CancellationToken::new())
            .expect("train");

        let mut other =
            SvmClassifier::new(id, FeatureSet::new(vec![FeatureGroup::Structure]), &config);
        assert!(matches!(
            other.load(&store),
            Err(StabilisError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn voter_target_shrinks_with_small_training_sets() {
        let params = VoterParams {
            network: NetworkParams {
                hidden: 25,
                target_error: 2.5,
                max_epochs: 5000,
            },
            target_per_sample: 1.0 / 500.0,
        };
        assert!((params.for_samples(2).target_error - 0.004).abs() < 1e-12);
        assert_eq!(params.for_samples(10_000).target_error, 2.5);
        assert_eq!(params.for_samples(2).hidden, 25);
    }

    #[test]
    fn corrupt_artifact_is_rejected_on_load() {
        let store = MemoryArtifactStore::new();
        let id = PredictorId::new(PredictorKind::RandomForest, 0);
        // Same wire layout as `RandomForest`; the split points back at itself.
        #[derive(Serialize)]
        enum NodeLayout {
            #[allow(dead_code)]
            Leaf(Stability),
            Split {
                feature: usize,
                threshold: f64,
                left: usize,
                right: usize,
            },
        }
        #[derive(Serialize)]
        struct ForestLayout {
            width: usize,
            trees: Vec<Vec<NodeLayout>>,
        }
        let corrupt = ForestLayout {
            width: 1,
            trees: vec![vec![NodeLayout::Split {
                feature: 0,
                threshold: 0.5,
                left: 0,
                right: 0,
            }]],
        };
        save_model(&store, id, &feature_set(), &corrupt).expect("save");

        let mut forest = ForestClassifier::new(id, feature_set(), &PipelineConfig::default());
        assert!(matches!(
            forest.init(InitMode::Load, &store),
            Err(StabilisError::Serialization(_))
        ));
        assert!(!forest.is_trained());
    }

    #[test]
    fn init_train_discards_state() {
        let store = MemoryArtifactStore::new();
        let mut svm = SvmClassifier::new(
            PredictorId::new(PredictorKind::Svm, 0),
            feature_set(),
            &PipelineConfig::default(),
        );
        svm.train(&records(), &store, &CancellationToken::new())
            .expect("train");
        assert!(svm.is_trained());
        svm.init(InitMode::Train, &store).expect("init");
        assert!(!svm.is_trained());
    }
}
