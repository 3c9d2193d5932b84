//! # Learners
//!
//! Concrete, seed-deterministic learning algorithms behind the predictor
//! contract. Each learner is a plain serde-serializable value that knows
//! its input width and refuses vectors of any other width. Restored
//! learners are checked with `validate` before use.
//!
//! | Learner | Task | Algorithm |
//! |---------|------|-----------|
//! | [`Network`] | classification, regression | 1 hidden layer, sigmoid, batch RPROP |
//! | [`LeastSquaresSvm`] | classification | LS-SVM, Gaussian kernel |
//! | [`RandomForest`] | classification | bagged CART trees, Gini |

mod forest;
mod network;
mod svm;

pub use forest::{ForestParams, RandomForest};
pub use network::{Network, NetworkParams};
pub use svm::{LeastSquaresSvm, SvmParams};

use crate::StabilisError;
use ndarray::Array2;

/// Reject a vector whose width differs from the model's input width.
pub(crate) fn check_width(expected: usize, actual: usize) -> Result<(), StabilisError> {
    if expected == actual {
        Ok(())
    } else {
        Err(StabilisError::InvalidEncoding(format!(
            "model expects {} inputs, vector has {}",
            expected, actual
        )))
    }
}

/// Width shared by every training vector.
pub(crate) fn training_width(samples: &[Vec<f64>]) -> Result<usize, StabilisError> {
    let width = samples
        .first()
        .map(Vec::len)
        .ok_or_else(|| StabilisError::EmptyTrainingSet("learner".to_string()))?;
    for sample in samples {
        check_width(width, sample.len())?;
    }
    Ok(width)
}

/// Training vectors as an `n × width` matrix, one sample per row.
pub(crate) fn sample_matrix(samples: &[Vec<f64>]) -> Result<Array2<f64>, StabilisError> {
    let width = training_width(samples)?;
    Array2::from_shape_vec((samples.len(), width), samples.concat())
        .map_err(|e| StabilisError::InvalidEncoding(e.to_string()))
}

/// Error for a restored learner whose state does not hold together.
pub(crate) fn corrupt_model(reason: impl std::fmt::Display) -> StabilisError {
    StabilisError::Serialization(format!("corrupt model: {}", reason))
}
