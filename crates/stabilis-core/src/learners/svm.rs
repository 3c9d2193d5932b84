//! # Least-Squares Support Vector Machine
//!
//! Binary LS-SVM with a Gaussian kernel. Training solves the dual system
//! by LU factorisation
//!
//! ```text
//! | 0   yᵀ            | | b |   | 0 |
//! | y   Ω + diag(1/c) | | α | = | 1 |      Ω_ij = y_i y_j k(x_i, x_j)
//! ```
//!
//! with labels `y ∈ {−1, +1}` (`+1` = stabilizing). The decision value is
//! `f(x) = Σ α_i y_i k(x, x_i) + b`, positive meaning stabilizing.
//!
//! - Kernel width: median pairwise squared distance over the first
//!   `kernel_estimation_samples` samples
//! - Complexity: `C = n / Σ k(x_i, x_i)`
//! - Class weighting: positives cost `C · weight_ratio`, negatives `C`

use super::{check_width, corrupt_model, sample_matrix};
use crate::system::CancellationToken;
use crate::{Stability, StabilisError};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, Zip, aview1, s};
use serde::{Deserialize, Serialize};

/// Training parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmParams {
    pub weight_ratio: f64,
    pub kernel_estimation_samples: usize,
}

/// A trained LS-SVM. Every training sample is a support vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeastSquaresSvm {
    width: usize,
    /// `2σ²` of the Gaussian kernel.
    kernel_scale: f64,
    /// One support vector per row.
    support_vectors: Array2<f64>,
    /// `α_i · y_i` per support vector.
    coefficients: Array1<f64>,
    bias: f64,
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    Zip::from(a)
        .and(b)
        .fold(0.0, |sum, x, y| sum + (x - y) * (x - y))
}

/// Median pairwise squared distance, `1.0` if every sample coincides.
fn estimate_sigma_squared(samples: &Array2<f64>, limit: usize) -> f64 {
    let sample = samples.slice(s![..samples.nrows().min(limit.max(2)), ..]);
    let rows = sample.nrows();
    let mut distances = Vec::with_capacity(rows * rows.saturating_sub(1) / 2);
    for i in 0..rows {
        for j in i + 1..rows {
            distances.push(squared_distance(sample.row(i), sample.row(j)));
        }
    }
    if distances.is_empty() {
        return 1.0;
    }
    distances.sort_by(f64::total_cmp);
    let mid = distances.len() / 2;
    let median = if distances.len() % 2 == 0 {
        (distances[mid - 1] + distances[mid]) / 2.0
    } else {
        distances[mid]
    };
    if median > 0.0 { median } else { 1.0 }
}

/// Solve `a · x = b` through an LU factorisation with partial pivoting.
fn solve_linear_system(
    a: DMatrix<f64>,
    b: DVector<f64>,
    cancel: &CancellationToken,
) -> Result<DVector<f64>, StabilisError> {
    cancel.check()?;
    let lu = a.lu();
    cancel.check()?;
    lu.solve(&b)
        .filter(|x| x.iter().all(|v| v.is_finite()))
        .ok_or_else(|| StabilisError::TrainingFailed("LS-SVM dual system is singular".to_string()))
}

impl LeastSquaresSvm {
    /// Fit the machine to labelled samples.
    pub fn train(
        samples: &[Vec<f64>],
        labels: &[Stability],
        params: &SvmParams,
        cancel: &CancellationToken,
    ) -> Result<Self, StabilisError> {
        if samples.len() != labels.len() {
            return Err(StabilisError::InvalidState(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        let support_vectors = sample_matrix(samples)?;
        let (n, width) = support_vectors.dim();

        let sigma_squared =
            estimate_sigma_squared(&support_vectors, params.kernel_estimation_samples);
        let kernel_scale = 2.0 * sigma_squared;

        let mut gram = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            if i % 256 == 0 {
                cancel.check()?;
            }
            for j in i..n {
                let distance = squared_distance(support_vectors.row(i), support_vectors.row(j));
                let value = (-distance / kernel_scale).exp();
                gram[[i, j]] = value;
                gram[[j, i]] = value;
            }
        }
        let complexity = n as f64 / gram.diag().sum();

        let y: Array1<f64> = labels
            .iter()
            .map(|label| match label {
                Stability::Stabilizing => 1.0,
                Stability::Destabilizing => -1.0,
            })
            .collect();
        let ridge = y.mapv(|yi| {
            if yi > 0.0 {
                1.0 / (complexity * params.weight_ratio)
            } else {
                1.0 / complexity
            }
        });

        // Dual system of size n + 1: row/column 0 holds the bias.
        let size = n + 1;
        let a = DMatrix::from_fn(size, size, |r, c| match (r, c) {
            (0, 0) => 0.0,
            (0, j) => y[j - 1],
            (i, 0) => y[i - 1],
            (i, j) if i == j => gram[[i - 1, i - 1]] + ridge[i - 1],
            (i, j) => y[i - 1] * y[j - 1] * gram[[i - 1, j - 1]],
        });
        let b = DVector::from_fn(size, |r, _| if r == 0 { 0.0 } else { 1.0 });

        let solution = solve_linear_system(a, b, cancel)?;
        let bias = solution[0];
        let coefficients = Array1::from_iter(solution.iter().skip(1).copied()) * &y;

        tracing::debug!(samples = n, width, sigma_squared, complexity, "LS-SVM trained");
        Ok(Self {
            width,
            kernel_scale,
            support_vectors,
            coefficients,
            bias,
        })
    }

    /// Signed decision value; positive means stabilizing.
    pub fn decision(&self, input: &[f64]) -> Result<f64, StabilisError> {
        check_width(self.width, input.len())?;
        let input = aview1(input);
        let sum = Zip::from(self.support_vectors.rows())
            .and(&self.coefficients)
            .fold(0.0, |sum, sv, c| {
                sum + c * (-squared_distance(sv, input) / self.kernel_scale).exp()
            });
        Ok(sum + self.bias)
    }

    /// Predicted label for one input vector.
    pub fn classify(&self, input: &[f64]) -> Result<Stability, StabilisError> {
        Ok(Stability::from_bool(self.decision(input)? > 0.0))
    }

    /// Number of inputs the machine was trained on.
    #[must_use]
    pub fn input_width(&self) -> usize {
        self.width
    }

    /// Check that restored state is consistent before it is used.
    pub fn validate(&self) -> Result<(), StabilisError> {
        let (rows, cols) = self.support_vectors.dim();
        if rows == 0 {
            return Err(corrupt_model("LS-SVM has no support vectors"));
        }
        if cols != self.width {
            return Err(corrupt_model(format!(
                "support vectors have {} columns, model width is {}",
                cols, self.width
            )));
        }
        if self.coefficients.len() != rows {
            return Err(corrupt_model(format!(
                "{} coefficients for {} support vectors",
                self.coefficients.len(),
                rows
            )));
        }
        if !(self.kernel_scale.is_finite() && self.kernel_scale > 0.0) {
            return Err(corrupt_model("LS-SVM kernel width is not positive"));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
