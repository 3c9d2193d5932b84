//! Regression specialists: a perceptron per ΔΔG polarity.
//!
//! A stabilizing specialist learns from records with ΔΔG < 0 and maps its
//! output into `[-11, 0]`; a destabilizing one learns from ΔΔG > 0 and maps
//! into `[0, 31]`. Records with ΔΔG exactly 0 train neither.

use super::{Predictor, PredictorId, Regressor, load_model, save_model};
use crate::config::PipelineConfig;
use crate::encoder::{self, FeatureSet};
use crate::learners::{Network, NetworkParams};
use crate::primitives::{DESTABILIZING_RANGE, STABILIZING_RANGE};
use crate::record::{NumericRecord, expected_regression};
use crate::rescale::DomainRange;
use crate::storage::ArtifactStore;
use crate::system::CancellationToken;
use crate::{Stability, StabilisError};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// ΔΔG interval modelled by a specialist of `polarity`.
#[must_use]
pub fn polarity_range(polarity: Stability) -> DomainRange {
    let (min, max) = match polarity {
        Stability::Stabilizing => STABILIZING_RANGE,
        Stability::Destabilizing => DESTABILIZING_RANGE,
    };
    DomainRange::new(min, max)
}

/// Whether a measured ΔΔG belongs to the training set of `polarity`.
fn in_polarity(polarity: Stability, ddg: f64) -> bool {
    match polarity {
        Stability::Stabilizing => ddg < 0.0,
        Stability::Destabilizing => ddg > 0.0,
    }
}

/// Perceptron ΔΔG specialist.
pub struct NetworkRegressor {
    id: PredictorId,
    polarity: Stability,
    feature_set: FeatureSet,
    hidden: usize,
    target_per_sample: f64,
    max_epochs: usize,
    seed: u64,
    model: Option<Network>,
}

impl NetworkRegressor {
    #[must_use]
    pub fn new(
        id: PredictorId,
        polarity: Stability,
        feature_set: FeatureSet,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            id,
            polarity,
            feature_set,
            hidden: config.network.regressor_hidden,
            target_per_sample: config.network.regressor_target_per_sample,
            max_epochs: config.network.max_epochs,
            seed: id.seed(config.seed),
            model: None,
        }
    }
}

impl Predictor for NetworkRegressor {
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

        let truths = expected_regression(records)?;
        let selected: Vec<usize> = truths
            .iter()
            .enumerate()
            .filter(|(_, ddg)| in_polarity(self.polarity, **ddg))
            .map(|(i, _)| i)
            .collect();
        if selected.is_empty() {
            return Err(StabilisError::EmptyTrainingSet(format!(
                "{} ({} records)",
                self.id, self.polarity
            )));
        }

        let subset: Vec<NumericRecord> = selected.iter().map(|&i| records[i].clone()).collect();
        let samples = encoder::encode(&subset, &self.feature_set)?;
        let range = polarity_range(self.polarity);
        let targets: Vec<f64> = selected
            .iter()
            .map(|&i| range.normalize(truths[i]).clamp(0.0, 1.0))
            .collect();

        let params = NetworkParams {
            hidden: self.hidden,
            target_error: samples.len() as f64 * self.target_per_sample,
            max_epochs: self.max_epochs,
        };
        let mut rng = StdRng::seed_from_u64(self.seed);

        tracing::debug!(
            member = %self.id,
            polarity = %self.polarity,
            samples = samples.len(),
            "training regressor"
        );
        let (network, _) = Network::train(&samples, &targets, &params, &mut rng, cancel)?;
        self.model = Some(network);
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
        let model: Network = load_model(store, self.id, &self.feature_set)?;
        model.validate()?;
        self.model = Some(model);
        Ok(())
    }
}

impl Regressor for NetworkRegressor {
    fn polarity(&self) -> Stability {
        self.polarity
    }

    fn output_range(&self) -> DomainRange {
        polarity_range(self.polarity)
    }

    fn run(
        &self,
        records: &[NumericRecord],
        labels: &[Stability],
    ) -> Result<Vec<f64>, StabilisError> {
        if labels.len() != records.len() {
            return Err(StabilisError::InvalidState(format!(
                "{} labels for {} records",
                labels.len(),
                records.len()
            )));
        }
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| StabilisError::ModelNotFound(self.id.to_string()))?;
        let range = self.output_range();

        encoder::encode(records, &self.feature_set)?
            .iter()
            .zip(labels)
            .map(|(vector, label)| {
                if *label == self.polarity {
                    Ok(range.denormalize(model.compute(vector)?))
                } else {
                    Ok(0.0)
                }
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
