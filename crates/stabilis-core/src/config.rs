//! # Pipeline Configuration
//!
//! Tunables of the standard roster. Every field has a default, so an
//! empty TOML table (or no file at all) yields the reference setup.

use crate::primitives::DEFAULT_WINDOW_SIZE;
use serde::{Deserialize, Serialize};

/// Configuration of one ensemble run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Neighbour offsets used when a predictor asks for default features.
    pub window_size: usize,
    /// Run independent roster members on the rayon pool.
    pub parallel: bool,
    /// Base seed; each predictor mixes in its own identifier.
    pub seed: u64,
    pub network: NetworkConfig,
    pub forest: ForestConfig,
    pub svm: SvmConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            parallel: true,
            seed: 0x5EED_F00D,
            network: NetworkConfig::default(),
            forest: ForestConfig::default(),
            svm: SvmConfig::default(),
        }
    }
}

/// Multilayer perceptron settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub classifier_hidden: usize,
    /// Absolute summed squared error at which classifier training stops.
    pub classifier_target_error: f64,
    /// Per-sample cap on the classifier target, for small training sets.
    pub classifier_target_per_sample: f64,
    pub regressor_hidden: usize,
    /// Regressor stopping error per training sample.
    pub regressor_target_per_sample: f64,
    pub max_epochs: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            classifier_hidden: 25,
            classifier_target_error: 2.5,
            classifier_target_per_sample: 1.0 / 500.0,
            regressor_hidden: 5,
            regressor_target_per_sample: 1.0 / 500.0,
            max_epochs: 5000,
        }
    }
}

/// Random forest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            trees: 20,
            max_depth: 24,
            min_samples_split: 2,
        }
    }
}

/// Least-squares SVM settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmConfig {
    /// Cost multiplier of the stabilizing (positive) class.
    pub weight_ratio: f64,
    /// Samples used to estimate the kernel width.
    pub kernel_estimation_samples: usize,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            weight_ratio: 2.0,
            kernel_estimation_samples: 1000,
        }
    }
}
