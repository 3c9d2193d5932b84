//! # Random Forest
//!
//! Bagged CART classification trees. Each tree is grown on a bootstrap
//! sample; each split looks at `⌈√d⌉` randomly chosen features and keeps
//! the threshold with the lowest weighted Gini impurity. Nodes live in a
//! flat arena per tree, children referenced by index. A parent is always
//! stored before its children, so every child index is greater than its
//! parent's and walking a tree always terminates.

use super::{check_width, corrupt_model, training_width};
use crate::system::CancellationToken;
use crate::{Stability, StabilisError};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index::sample as sample_indices;
use serde::{Deserialize, Serialize};

/// Forest shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf(Stability),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Every split must name an input feature and point forward to nodes
    /// that exist.
    fn validate(&self, width: usize) -> Result<(), StabilisError> {
        if self.nodes.is_empty() {
            return Err(corrupt_model("random forest tree has no nodes"));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            let Node::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            else {
                continue;
            };
            if *feature >= width {
                return Err(corrupt_model(format!(
                    "node {} splits on feature {} of {}",
                    index, feature, width
                )));
            }
            if threshold.is_nan() {
                return Err(corrupt_model(format!("node {} has a NaN threshold", index)));
            }
            for child in [*left, *right] {
                if child <= index || child >= self.nodes.len() {
                    return Err(corrupt_model(format!(
                        "node {} links to node {} of {}",
                        index,
                        child,
                        self.nodes.len()
                    )));
                }
            }
        }
        Ok(())
    }

    fn classify(&self, input: &[f64]) -> Stability {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if input[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                Some(Node::Leaf(label)) => return *label,
                None => return Stability::Destabilizing,
            }
        }
    }
}

/// A trained forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    width: usize,
    trees: Vec<Tree>,
}

/// Gini impurity of a node holding `positives` out of `total`.
fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Majority label, ties resolve to destabilizing.
fn majority(positives: usize, total: usize) -> Stability {
    Stability::from_bool(2 * positives > total)
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    samples: &'a [Vec<f64>],
    labels: &'a [Stability],
    params: &'a ForestParams,
    features_per_split: usize,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let total = indices.len();
        let positives = indices
            .iter()
            .filter(|&&i| self.labels[i] == Stability::Stabilizing)
            .count();

        let node_index = self.nodes.len();
        self.nodes.push(Node::Leaf(majority(positives, total)));

        if positives == 0
            || positives == total
            || depth >= self.params.max_depth
            || total < self.params.min_samples_split
        {
            return node_index;
        }

        let Some(split) = self.best_split(indices, positives, rng) else {
            return node_index;
        };

        // Partition in place: left side holds values <= threshold
        let mut boundary = 0;
        for k in 0..indices.len() {
            if self.samples[indices[k]][split.feature] <= split.threshold {
                indices.swap(k, boundary);
                boundary += 1;
            }
        }
        let (left_indices, right_indices) = indices.split_at_mut(boundary);
        let left = self.grow(left_indices, depth + 1, rng);
        let right = self.grow(right_indices, depth + 1, rng);

        self.nodes[node_index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_index
    }

    fn best_split(&self, indices: &[usize], positives: usize, rng: &mut StdRng) -> Option<Split> {
        let width = self.samples[indices[0]].len();
        let total = indices.len();
        let parent = gini(positives, total);

        let mut best: Option<Split> = None;
        let mut ordered: Vec<(f64, bool)> = Vec::with_capacity(total);
        for feature in sample_indices(rng, width, self.features_per_split) {
            ordered.clear();
            ordered.extend(indices.iter().map(|&i| {
                (
                    self.samples[i][feature],
                    self.labels[i] == Stability::Stabilizing,
                )
            }));
            ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_positives = 0;
            for k in 0..total - 1 {
                if ordered[k].1 {
                    left_positives += 1;
                }
                if ordered[k].0 == ordered[k + 1].0 {
                    continue;
                }
                let left_total = k + 1;
                let right_total = total - left_total;
                let impurity = (left_total as f64 * gini(left_positives, left_total)
                    + right_total as f64 * gini(positives - left_positives, right_total))
                    / total as f64;
                if impurity < parent
                    && best.as_ref().is_none_or(|b| impurity < b.impurity)
                {
                    best = Some(Split {
                        feature,
                        threshold: (ordered[k].0 + ordered[k + 1].0) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

impl RandomForest {
    /// Grow a forest on labelled samples.
    pub fn train(
        samples: &[Vec<f64>],
        labels: &[Stability],
        params: &ForestParams,
        rng: &mut StdRng,
        cancel: &CancellationToken,
    ) -> Result<Self, StabilisError> {
        if samples.len() != labels.len() {
            return Err(StabilisError::InvalidState(format!(
                "{} samples but {} labels",
                samples.len(),
                labels.len()
            )));
        }
        let width = training_width(samples)?;
        if width == 0 {
            return Err(StabilisError::TrainingFailed(
                "random forest needs at least one feature".to_string(),
            ));
        }
        let n = samples.len();
        let features_per_split = ((width as f64).sqrt().ceil() as usize).clamp(1, width);

        let mut trees = Vec::with_capacity(params.trees);
        for _ in 0..params.trees.max(1) {
            cancel.check()?;
            let mut bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut builder = TreeBuilder {
                samples,
                labels,
                params,
                features_per_split,
                nodes: Vec::new(),
            };
            builder.grow(&mut bootstrap, 0, rng);
            trees.push(Tree {
                nodes: builder.nodes,
            });
        }

        tracing::debug!(
            trees = trees.len(),
            samples = n,
            width,
            features_per_split,
            "random forest grown"
        );
        Ok(Self { width, trees })
    }

    /// Majority vote of the trees; ties resolve to destabilizing.
    pub fn classify(&self, input: &[f64]) -> Result<Stability, StabilisError> {
        check_width(self.width, input.len())?;
        let votes = self
            .trees
            .iter()
            .filter(|tree| tree.classify(input) == Stability::Stabilizing)
            .count();
        Ok(majority(votes, self.trees.len()))
    }

    /// Number of inputs the forest was trained on.
    #[must_use]
    pub fn input_width(&self) -> usize {
        self.width
    }

    /// Check restored trees before they are walked.
    pub fn validate(&self) -> Result<(), StabilisError> {
        if self.trees.is_empty() {
            return Err(corrupt_model("random forest has no trees"));
        }
        self.trees.iter().try_for_each(|tree| tree.validate(self.width))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params() -> ForestParams {
        ForestParams {
            trees: 15,
            max_depth: 8,
            min_samples_split: 2,
        }
    }

    fn threshold_dataset() -> (Vec<Vec<f64>>, Vec<Stability>) {
        let samples: Vec<Vec<f64>> = (0..40).map(|i| vec![f64::from(i) / 40.0]).collect();
        let labels = samples
            .iter()
            .map(|x| Stability::from_bool(x[0] < 0.5))
            .collect();
        (samples, labels)
    }

    #[test]
    fn gini_bounds() {
        assert_eq!(gini(0, 10), 0.0);
        assert_eq!(gini(10, 10), 0.0);
        assert_eq!(gini(5, 10), 0.5);
        assert_eq!(gini(0, 0), 0.0);
    }

    #[test]
    fn ties_resolve_to_destabilizing() {
        assert_eq!(majority(2, 4), Stability::Destabilizing);
        assert_eq!(majority(3, 4), Stability::Stabilizing);
    }

    #[test]
    fn learns_a_threshold() {
        let (samples, labels) = threshold_dataset();
        let forest = RandomForest::train(
            &samples,
            &labels,
            &params(),
            &mut StdRng::seed_from_u64(11),
            &CancellationToken::new(),
        )
        .expect("train");

        assert_eq!(forest.classify(&[0.05]).expect("low"), Stability::Stabilizing);
        assert_eq!(forest.classify(&[0.95]).expect("high"), Stability::Destabilizing);
    }

    #[test]
    fn deterministic_under_seed() {
        let (samples, labels) = threshold_dataset();
        let cancel = CancellationToken::new();
        let mut rng = StdRng::seed_from_u64(5);
        let a = RandomForest::train(&samples, &labels, &params(), &mut rng, &cancel).expect("a");
        let mut rng = StdRng::seed_from_u64(5);
        let b = RandomForest::train(&samples, &labels, &params(), &mut rng, &cancel).expect("b");
        assert_eq!(a, b);
    }

    #[test]
    fn grown_forest_passes_validation() {
        let (samples, labels) = threshold_dataset();
        let forest = RandomForest::train(
            &samples,
            &labels,
            &params(),
            &mut StdRng::seed_from_u64(2),
            &CancellationToken::new(),
        )
        .expect("train");
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn corrupt_trees_fail_validation() {
        let split = |feature, left, right| Node::Split {
            feature,
            threshold: 0.5,
            left,
            right,
        };
        let leaf = Node::Leaf(Stability::Stabilizing);
        let forest = |nodes: Vec<Node>| RandomForest {
            width: 1,
            trees: vec![Tree { nodes }],
        };

        let cyclic = forest(vec![split(0, 0, 1), leaf.clone()]);
        let dangling = forest(vec![split(0, 1, 7), leaf.clone()]);
        let wide = forest(vec![split(3, 1, 2), leaf.clone(), leaf.clone()]);
        let hollow = forest(vec![]);
        for corrupt in [cyclic, dangling, wide, hollow] {
            assert!(
                matches!(corrupt.validate(), Err(StabilisError::Serialization(_))),
                "{:?}",
                corrupt
            );
        }

        let sound = forest(vec![
            split(0, 1, 2),
            leaf.clone(),
            Node::Leaf(Stability::Destabilizing),
        ]);
        assert!(sound.validate().is_ok());
        assert_eq!(sound.classify(&[0.9]).expect("classify"), Stability::Destabilizing);
        assert!(
            RandomForest {
                width: 1,
                trees: vec![]
            }
            .validate()
            .is_err()
        );
    }

    #[test]
    fn single_class_gives_constant_leaf() {
        let samples = vec![vec![0.1], vec![0.2]];
        let labels = vec![Stability::Stabilizing; 2];
        let forest = RandomForest::train(
            &samples,
            &labels,
            &params(),
            &mut StdRng::seed_from_u64(1),
            &CancellationToken::new(),
        )
        .expect("train");
        assert_eq!(forest.classify(&[9.0]).expect("any"), Stability::Stabilizing);
        assert!(forest.classify(&[0.1, 0.2]).is_err());
    }
}
