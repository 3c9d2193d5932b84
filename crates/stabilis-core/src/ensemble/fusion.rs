//! Fusion rules: majority vote over classifiers, pair average over the
//! regression specialists selected by the fused label.

use crate::Stability;
use crate::primitives::SPECIALISTS_PER_POLARITY;

/// Fuse per-classifier label vectors into one label per record.
///
/// A record is stabilizing iff strictly more than half of the classifiers
/// say so; an even split resolves to destabilizing.
#[must_use]
pub fn majority_vote(votes: &[Vec<Stability>], records: usize) -> Vec<Stability> {
    let voters = votes.len();
    (0..records)
        .map(|i| {
            let stabilizing = votes
                .iter()
                .filter(|member| member.get(i) == Some(&Stability::Stabilizing))
                .count();
            Stability::from_bool(2 * stabilizing > voters)
        })
        .collect()
}

/// Fuse regression outputs: for each record, the sum of the outputs of the
/// specialists whose polarity matches its label, divided by the fixed
/// specialist count per polarity.
#[must_use]
pub fn pair_average(outputs: &[(Stability, Vec<f64>)], labels: &[Stability]) -> Vec<f64> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let sum: f64 = outputs
                .iter()
                .filter(|(polarity, _)| polarity == label)
                .filter_map(|(_, values)| values.get(i))
                .sum();
            sum / SPECIALISTS_PER_POLARITY as f64
        })
        .collect()
}
