//! # Evaluation
//!
//! Scores a run against ground truth: confusion-matrix metrics for the
//! fused labels (stabilizing is the positive class) and the mean squared
//! error of the fused ΔΔG. Every ratio is `0.0` when its denominator is.

use crate::{Stability, StabilisError};
use serde::{Deserialize, Serialize};

/// Binary confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn check_lengths(expected: usize, predicted: usize) -> Result<(), StabilisError> {
    if expected == predicted {
        Ok(())
    } else {
        Err(StabilisError::InvalidState(format!(
            "{} expected values but {} predictions",
            expected, predicted
        )))
    }
}

impl ConfusionMatrix {
    pub fn compute(expected: &[Stability], predicted: &[Stability]) -> Result<Self, StabilisError> {
        check_lengths(expected.len(), predicted.len())?;
        let mut matrix = Self::default();
        for (truth, guess) in expected.iter().zip(predicted) {
            match (truth, guess) {
                (Stability::Stabilizing, Stability::Stabilizing) => matrix.true_positives += 1,
                (Stability::Destabilizing, Stability::Destabilizing) => {
                    matrix.true_negatives += 1;
                }
                (Stability::Destabilizing, Stability::Stabilizing) => matrix.false_positives += 1,
                (Stability::Stabilizing, Stability::Destabilizing) => matrix.false_negatives += 1,
            }
        }
        Ok(matrix)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// TP / (TP + FN)
    #[must_use]
    pub fn sensitivity(&self) -> f64 {
        let tp = self.true_positives as f64;
        ratio(tp, tp + self.false_negatives as f64)
    }

    /// TN / (TN + FP)
    #[must_use]
    pub fn specificity(&self) -> f64 {
        let tn = self.true_negatives as f64;
        ratio(tn, tn + self.false_positives as f64)
    }

    /// TP / (TP + FP)
    #[must_use]
    pub fn precision(&self) -> f64 {
        let tp = self.true_positives as f64;
        ratio(tp, tp + self.false_positives as f64)
    }

    /// Harmonic mean of precision and sensitivity.
    #[must_use]
    pub fn f_score(&self) -> f64 {
        let (p, r) = (self.precision(), self.sensitivity());
        ratio(2.0 * p * r, p + r)
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(
            (self.true_positives + self.true_negatives) as f64,
            self.total() as f64,
        )
    }

    /// Matthews correlation coefficient.
    #[must_use]
    pub fn matthews(&self) -> f64 {
        let tp = self.true_positives as f64;
        let tn = self.true_negatives as f64;
        let fp = self.false_positives as f64;
        let fn_ = self.false_negatives as f64;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        ratio(tp * tn - fp * fn_, denominator)
    }
}

/// Mean of the squared differences; `0.0` for empty input.
pub fn mean_squared_error(expected: &[f64], predicted: &[f64]) -> Result<f64, StabilisError> {
    check_lengths(expected.len(), predicted.len())?;
    let sum: f64 = expected
        .iter()
        .zip(predicted)
        .map(|(e, p)| (e - p) * (e - p))
        .sum();
    Ok(ratio(sum, expected.len() as f64))
}

/// Scores of one evaluated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub confusion: ConfusionMatrix,
    pub sensitivity: f64,
    pub specificity: f64,
    pub precision: f64,
    pub f_score: f64,
    pub accuracy: f64,
    pub matthews: f64,
    pub mean_squared_error: f64,
}

impl EvaluationReport {
    pub fn compute(
        expected_labels: &[Stability],
        predicted_labels: &[Stability],
        expected_ddg: &[f64],
        predicted_ddg: &[f64],
    ) -> Result<Self, StabilisError> {
        let confusion = ConfusionMatrix::compute(expected_labels, predicted_labels)?;
        Ok(Self {
            confusion,
            sensitivity: confusion.sensitivity(),
            specificity: confusion.specificity(),
            precision: confusion.precision(),
            f_score: confusion.f_score(),
            accuracy: confusion.accuracy(),
            matthews: confusion.matthews(),
            mean_squared_error: mean_squared_error(expected_ddg, predicted_ddg)?,
        })
    }
}
