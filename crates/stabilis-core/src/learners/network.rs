//! # Multilayer Perceptron
//!
//! One hidden layer, sigmoid activations (`α = 2`) on both layers,
//! Nguyen-Widrow initialisation, batch resilient back-propagation.
//!
//! The training error is `½ Σ (t − y)²` over the whole training set,
//! measured during each epoch's gradient pass. Every epoch applies one
//! weight update, so a run performs at least one update. Training stops
//! once the last measured error is at or below the target, or after
//! `max_epochs`.

use super::{check_width, corrupt_model, sample_matrix};
use crate::StabilisError;
use crate::system::CancellationToken;
use ndarray::{Array, Array1, Array2, ArrayView1, Dimension, Zip, aview1, s};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

const SIGMOID_ALPHA: f64 = 2.0;

// RPROP constants
const ETA_PLUS: f64 = 1.2;
const ETA_MINUS: f64 = 0.5;
const INITIAL_STEP: f64 = 0.0125;
const MAX_STEP: f64 = 50.0;
const MIN_STEP: f64 = 1e-6;

/// Shape and stopping rule of one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkParams {
    pub hidden: usize,
    pub target_error: f64,
    pub max_epochs: usize,
}

/// A trained (or freshly initialised) perceptron with a single output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    inputs: usize,
    hidden: usize,
    /// `hidden × (inputs + 1)`, bias in the last column.
    hidden_weights: Array2<f64>,
    /// `hidden + 1` entries, bias last.
    output_weights: Array1<f64>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-SIGMOID_ALPHA * x).exp())
}

/// Derivative expressed through the activation's output.
fn sigmoid_derivative(y: f64) -> f64 {
    SIGMOID_ALPHA * y * (1.0 - y)
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Per-weight RPROP state for one weight array.
struct Rprop<D: Dimension> {
    gradients: Array<f64, D>,
    previous: Array<f64, D>,
    steps: Array<f64, D>,
}

impl<D: Dimension> Rprop<D> {
    fn for_shape(weights: &Array<f64, D>) -> Self {
        Self {
            gradients: Array::zeros(weights.raw_dim()),
            previous: Array::zeros(weights.raw_dim()),
            steps: Array::from_elem(weights.raw_dim(), INITIAL_STEP),
        }
    }

    fn update(&mut self, weights: &mut Array<f64, D>) {
        Zip::from(weights)
            .and(&self.gradients)
            .and(&mut self.previous)
            .and(&mut self.steps)
            .for_each(|weight, &gradient, previous, step| {
                let change = *previous * gradient;
                if change > 0.0 {
                    *step = (*step * ETA_PLUS).min(MAX_STEP);
                    *weight -= sign(gradient) * *step;
                    *previous = gradient;
                } else if change < 0.0 {
                    *step = (*step * ETA_MINUS).max(MIN_STEP);
                    *previous = 0.0;
                } else {
                    *weight -= sign(gradient) * *step;
                    *previous = gradient;
                }
            });
    }
}

impl Network {
    /// Nguyen-Widrow initialised network.
    pub fn new(inputs: usize, hidden: usize, rng: &mut StdRng) -> Self {
        let hidden = hidden.max(1);
        let beta = 0.7 * (hidden as f64).powf(1.0 / inputs.max(1) as f64);

        let mut hidden_weights = Array2::<f64>::zeros((hidden, inputs + 1));
        for mut row in hidden_weights.rows_mut() {
            let mut weights = row.slice_mut(s![..inputs]);
            for w in weights.iter_mut() {
                *w = rng.gen_range(-0.5..0.5);
            }
            let norm = weights.dot(&weights).sqrt();
            if norm > 0.0 {
                weights *= beta / norm;
            }
            row[inputs] = rng.gen_range(-beta..beta);
        }

        let output_weights = Array1::from_shape_fn(hidden + 1, |_| rng.gen_range(-0.5..0.5));

        Self {
            inputs,
            hidden,
            hidden_weights,
            output_weights,
        }
    }

    /// Fit a network to `targets` (each in `[0, 1]`).
    ///
    /// Returns the network and the last measured training error.
    pub fn train(
        samples: &[Vec<f64>],
        targets: &[f64],
        params: &NetworkParams,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<(Self, f64), StabilisError> {
        if samples.len() != targets.len() {
            return Err(StabilisError::InvalidState(format!(
                "{} samples but {} targets",
                samples.len(),
                targets.len()
            )));
        }
        let samples = sample_matrix(samples)?;
        let inputs = samples.ncols();
        let mut network = Self::new(inputs, params.hidden, rng);

        let mut hidden_state = Rprop::for_shape(&network.hidden_weights);
        let mut output_state = Rprop::for_shape(&network.output_weights);

        let mut error = f64::INFINITY;
        let mut epochs = 0;
        while error > params.target_error && epochs < params.max_epochs {
            cancel.check()?;
            error = network.accumulate_gradients(
                &samples,
                targets,
                &mut hidden_state.gradients,
                &mut output_state.gradients,
            );
            hidden_state.update(&mut network.hidden_weights);
            output_state.update(&mut network.output_weights);
            epochs += 1;
        }

        tracing::debug!(
            inputs,
            hidden = network.hidden,
            epochs,
            error,
            "network training finished"
        );
        Ok((network, error))
    }

    /// Network output for one input vector, in `(0, 1)`.
    pub fn compute(&self, input: &[f64]) -> Result<f64, StabilisError> {
        check_width(self.inputs, input.len())?;
        Ok(self.forward(aview1(input)).1)
    }

    /// Number of inputs the network was built for.
    #[must_use]
    pub fn input_width(&self) -> usize {
        self.inputs
    }

    /// Check that restored weights match the declared shape and are finite.
    pub fn validate(&self) -> Result<(), StabilisError> {
        if self.hidden == 0 {
            return Err(corrupt_model("network has no hidden neurons"));
        }
        if self.hidden_weights.dim() != (self.hidden, self.inputs + 1) {
            return Err(corrupt_model(format!(
                "hidden weights are {:?}, expected ({}, {})",
                self.hidden_weights.dim(),
                self.hidden,
                self.inputs + 1
            )));
        }
        if self.output_weights.len() != self.hidden + 1 {
            return Err(corrupt_model(format!(
                "{} output weights for {} hidden neurons",
                self.output_weights.len(),
                self.hidden
            )));
        }
        let finite = self.hidden_weights.iter().all(|w| w.is_finite())
            && self.output_weights.iter().all(|w| w.is_finite());
        if !finite {
            return Err(corrupt_model("network weights are not finite"));
        }
        Ok(())
    }

    /// Hidden activations and the output for one input.
    fn forward(&self, input: ArrayView1<'_, f64>) -> (Array1<f64>, f64) {
        let weights = self.hidden_weights.slice(s![.., ..self.inputs]);
        let bias = self.hidden_weights.column(self.inputs);
        let activations = (weights.dot(&input) + &bias).mapv(sigmoid);
        let sum = self.output_weights.slice(s![..self.hidden]).dot(&activations)
            + self.output_weights[self.hidden];
        (activations, sigmoid(sum))
    }

    /// Batch gradient of `½ Σ (t − y)²`; returns the error.
    fn accumulate_gradients(
        &self,
        samples: &Array2<f64>,
        targets: &[f64],
        hidden_gradients: &mut Array2<f64>,
        output_gradients: &mut Array1<f64>,
    ) -> f64 {
        hidden_gradients.fill(0.0);
        output_gradients.fill(0.0);
        let output_links = self.output_weights.slice(s![..self.hidden]);

        let mut error = 0.0;
        for (input, &target) in samples.rows().into_iter().zip(targets) {
            let (activations, output) = self.forward(input);
            let diff = output - target;
            error += 0.5 * diff * diff;

            let delta_out = diff * sigmoid_derivative(output);
            output_gradients
                .slice_mut(s![..self.hidden])
                .scaled_add(delta_out, &activations);
            output_gradients[self.hidden] += delta_out;

            let deltas = Zip::from(&activations)
                .and(&output_links)
                .map_collect(|&h, &w| delta_out * w * sigmoid_derivative(h));
            for (mut row, &delta) in hidden_gradients.rows_mut().into_iter().zip(&deltas) {
                if delta == 0.0 {
                    continue;
                }
                row.slice_mut(s![..self.inputs]).scaled_add(delta, &input);
                row[self.inputs] += delta;
            }
        }
        error
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn dataset() -> (Vec<Vec<f64>>, Vec<f64>) {
        (
            vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
            ],
            vec![0.0, 0.0, 1.0, 1.0],
        )
    }

    fn params() -> NetworkParams {
        NetworkParams {
            hidden: 4,
            target_error: 0.005,
            max_epochs: 3000,
        }
    }

    #[test]
    fn learns_a_separable_rule() {
        let (samples, targets) = dataset();
        let mut rng = StdRng::seed_from_u64(7);
        let (network, error) =
            Network::train(&samples, &targets, &params(), &mut rng, &CancellationToken::new())
                .expect("train");

        assert!(error <= 0.005, "error {} above target", error);
        for (sample, target) in samples.iter().zip(&targets) {
            let output = network.compute(sample).expect("compute");
            assert_eq!(output > 0.5, *target > 0.5, "sample {:?}", sample);
        }
    }

    #[test]
    fn loose_target_still_updates_weights() {
        // Two samples can never exceed an error of 1.0, so the target is met
        // before training starts.
        let samples = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let targets = vec![1.0, 0.0];
        let loose = NetworkParams {
            hidden: 25,
            target_error: 2.5,
            max_epochs: 5000,
        };
        let (trained, _) = Network::train(
            &samples,
            &targets,
            &loose,
            &mut StdRng::seed_from_u64(11),
            &CancellationToken::new(),
        )
        .expect("train");

        let untrained = Network::new(2, 25, &mut StdRng::seed_from_u64(11));
        assert_ne!(trained, untrained);
    }

    #[test]
    fn same_seed_same_weights() {
        let (samples, targets) = dataset();
        let cancel = CancellationToken::new();
        let mut rng = StdRng::seed_from_u64(3);
        let (a, _) =
            Network::train(&samples, &targets, &params(), &mut rng, &cancel).expect("train a");
        let mut rng = StdRng::seed_from_u64(3);
        let (b, _) =
            Network::train(&samples, &targets, &params(), &mut rng, &cancel).expect("train b");
        assert_eq!(a, b);
    }

    #[test]
    fn wrong_width_is_invalid_encoding() {
        let network = Network::new(3, 2, &mut StdRng::seed_from_u64(1));
        assert!(matches!(
            network.compute(&[1.0]),
            Err(StabilisError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn mismatched_weight_shape_fails_validation() {
        let mut network = Network::new(3, 2, &mut StdRng::seed_from_u64(1));
        assert!(network.validate().is_ok());

        network.output_weights = Array1::zeros(1);
        assert!(matches!(
            network.validate(),
            Err(StabilisError::Serialization(_))
        ));
    }

    #[test]
    fn cancelled_training_stops() {
        let (samples, targets) = dataset();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut rng = StdRng::seed_from_u64(1);
        let result = Network::train(&samples, &targets, &params(), &mut rng, &cancel);
        assert!(matches!(result, Err(StabilisError::Cancelled)));
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let result = Network::train(
            &[],
            &[],
            &params(),
            &mut StdRng::seed_from_u64(1),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(StabilisError::EmptyTrainingSet(_))));
    }
}
