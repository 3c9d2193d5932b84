//! # Feature Encoder
//!
//! Turns numeric records into flat feature vectors.
//!
//! Every vector starts with the 40-wide (old residue, new residue) one-hot
//! block, followed by the requested feature groups in caller order:
//!
//! | Group | Width | Content |
//! |-------|-------|---------|
//! | `windowAA<k>` | `k * 40` | one-hot of `prevAA<j>` / `nextAA<j>` per offset |
//! | `3D_freq` | 20 | `3D_freq_<letter>` in canonical residue order |
//! | `struc` | 7 | one-hot of the DSSP class |
//! | any other key | 1 | the record's value, unmodified |
//!
//! Group order is part of a model's input contract: the same `FeatureSet`
//! must be used for training and inference.

use crate::primitives::{
    AMINO_ACID_COUNT, DEFAULT_WINDOW_SIZE, GROUND_TRUTH_KEY, MUTATION_BLOCK_WIDTH, NEW_AA_KEY,
    NEXT_AA_PREFIX, OLD_AA_KEY, PREV_AA_PREFIX, SPATIAL_FREQUENCY_KEY, STRUCTURE_CLASS_COUNT,
    STRUCTURE_KEY, WINDOW_GROUP_PREFIX, WINDOW_SLOT_WIDTH,
};
use crate::record::NumericRecord;
use crate::{AminoAcid, StabilisError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One encoded record.
pub type FeatureVector = Vec<f64>;

// =============================================================================
// FEATURE GROUPS
// =============================================================================

/// A named block of the feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FeatureGroup {
    /// `windowAA<k>`: sequence neighbours at offsets 1..=k on both sides.
    Window(usize),
    /// `3D_freq`: spatial-neighbour frequency per residue type.
    SpatialFrequency,
    /// `struc`: secondary-structure one-hot.
    Structure,
    /// Any other key, copied as one scalar.
    Scalar(String),
}

impl FeatureGroup {
    /// Parse a group name.
    ///
    /// `windowAA<k>` requires a positive integer `k`.
    pub fn parse(name: &str) -> Result<Self, StabilisError> {
        if let Some(size) = name.strip_prefix(WINDOW_GROUP_PREFIX) {
            return match size.parse::<usize>() {
                Ok(k) if k > 0 => Ok(Self::Window(k)),
                _ => Err(StabilisError::InvalidEncoding(format!(
                    "'{}' is not a valid window group",
                    name
                ))),
            };
        }
        Ok(match name {
            SPATIAL_FREQUENCY_KEY => Self::SpatialFrequency,
            STRUCTURE_KEY => Self::Structure,
            _ => Self::Scalar(name.to_string()),
        })
    }

    /// Number of vector slots this group occupies.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::Window(k) => k * WINDOW_SLOT_WIDTH,
            Self::SpatialFrequency => AMINO_ACID_COUNT,
            Self::Structure => STRUCTURE_CLASS_COUNT,
            Self::Scalar(_) => 1,
        }
    }

    /// The group name as used in configuration.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Window(k) => format!("{}{}", WINDOW_GROUP_PREFIX, k),
            Self::SpatialFrequency => SPATIAL_FREQUENCY_KEY.to_string(),
            Self::Structure => STRUCTURE_KEY.to_string(),
            Self::Scalar(key) => key.clone(),
        }
    }
}

impl std::fmt::Display for FeatureGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<String> for FeatureGroup {
    type Error = StabilisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FeatureGroup> for String {
    fn from(group: FeatureGroup) -> Self {
        group.name()
    }
}

// =============================================================================
// FEATURE SET
// =============================================================================

/// The ordered feature groups a predictor consumes.
///
/// An empty group list stands for the default set (every usable key plus a
/// window of `window_size` and the spatial frequencies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    groups: Vec<FeatureGroup>,
    window_size: usize,
}

impl FeatureSet {
    /// Create a feature set from explicit groups.
    #[must_use]
    pub fn new(groups: Vec<FeatureGroup>) -> Self {
        Self {
            groups,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    /// Parse a feature set from group names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, StabilisError> {
        let groups = names
            .iter()
            .map(|n| FeatureGroup::parse(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(groups))
    }

    /// Window width used when the default set is substituted.
    #[must_use]
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Explicit groups (empty for the default set).
    #[must_use]
    pub fn groups(&self) -> &[FeatureGroup] {
        &self.groups
    }

    /// Check if this set stands for the default groups.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.groups.is_empty()
    }

    /// The concrete groups used for `records`.
    #[must_use]
    pub fn resolve(&self, records: &[NumericRecord]) -> Vec<FeatureGroup> {
        if self.is_default() {
            default_groups(records, self.window_size)
        } else {
            self.groups.clone()
        }
    }
}

/// Default groups: every key found in any record, minus ground truth,
/// residue codes, window neighbours and per-residue frequencies, then a
/// `windowAA<window_size>` block and the `3D_freq` block.
///
/// Keys are collected across all records so that an optional column
/// missing from the first record does not shift later vectors.
#[must_use]
pub fn default_groups(records: &[NumericRecord], window_size: usize) -> Vec<FeatureGroup> {
    let keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();

    let mut groups: Vec<FeatureGroup> = keys
        .into_iter()
        .filter(|key| {
            *key != GROUND_TRUTH_KEY
                && *key != OLD_AA_KEY
                && *key != NEW_AA_KEY
                && !key.contains(PREV_AA_PREFIX)
                && !key.contains(NEXT_AA_PREFIX)
                && !key.contains(SPATIAL_FREQUENCY_KEY)
        })
        .map(|key| match key {
            STRUCTURE_KEY => FeatureGroup::Structure,
            _ => FeatureGroup::Scalar(key.to_string()),
        })
        .collect();

    groups.push(FeatureGroup::Window(window_size));
    groups.push(FeatureGroup::SpatialFrequency);
    groups
}

/// Total vector width for `groups`, including the mutation block.
#[must_use]
pub fn vector_width(groups: &[FeatureGroup]) -> usize {
    MUTATION_BLOCK_WIDTH + groups.iter().map(FeatureGroup::width).sum::<usize>()
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode every record with `feature_set`, substituting the default groups
/// when the set is empty.
pub fn encode(
    records: &[NumericRecord],
    feature_set: &FeatureSet,
) -> Result<Vec<FeatureVector>, StabilisError> {
    let groups = feature_set.resolve(records);
    encode_groups(records, &groups)
}

/// Encode every record with an already resolved group list.
pub fn encode_groups(
    records: &[NumericRecord],
    groups: &[FeatureGroup],
) -> Result<Vec<FeatureVector>, StabilisError> {
    let width = vector_width(groups);
    records
        .iter()
        .enumerate()
        .map(|(i, record)| encode_record(i, record, groups, width))
        .collect()
}

fn encode_record(
    index: usize,
    record: &NumericRecord,
    groups: &[FeatureGroup],
    width: usize,
) -> Result<FeatureVector, StabilisError> {
    let mut vector = Vec::with_capacity(width);

    let mut mutation = [0.0; MUTATION_BLOCK_WIDTH];
    let old = required_code(index, record, OLD_AA_KEY, AMINO_ACID_COUNT)?;
    let new = required_code(index, record, NEW_AA_KEY, AMINO_ACID_COUNT)?;
    mutation[old - 1] = 1.0;
    mutation[new - 1 + AMINO_ACID_COUNT] = 1.0;
    vector.extend_from_slice(&mutation);

    for group in groups {
        match group {
            FeatureGroup::Window(k) => {
                let mut block = vec![0.0; k * WINDOW_SLOT_WIDTH];
                for j in 1..=*k {
                    let slot = (j - 1) * WINDOW_SLOT_WIDTH;
                    let prev = optional_code(
                        index,
                        record,
                        &format!("{}{}", PREV_AA_PREFIX, j),
                        AMINO_ACID_COUNT,
                    )?;
                    let next = optional_code(
                        index,
                        record,
                        &format!("{}{}", NEXT_AA_PREFIX, j),
                        AMINO_ACID_COUNT,
                    )?;
                    if prev > 0 {
                        block[slot + prev - 1] = 1.0;
                    }
                    if next > 0 {
                        block[slot + next - 1 + AMINO_ACID_COUNT] = 1.0;
                    }
                }
                vector.extend(block);
            }
            FeatureGroup::SpatialFrequency => {
                for aa in AminoAcid::ALL {
                    let key = format!("{}_{}", SPATIAL_FREQUENCY_KEY, aa.letter());
                    vector.push(scalar(index, record, &key)?);
                }
            }
            FeatureGroup::Structure => {
                let mut block = [0.0; STRUCTURE_CLASS_COUNT];
                let code = optional_code(index, record, STRUCTURE_KEY, STRUCTURE_CLASS_COUNT)?;
                if code > 0 {
                    block[code - 1] = 1.0;
                }
                vector.extend_from_slice(&block);
            }
            FeatureGroup::Scalar(key) => vector.push(scalar(index, record, key)?),
        }
    }

    Ok(vector)
}

fn scalar(index: usize, record: &NumericRecord, key: &str) -> Result<f64, StabilisError> {
    record
        .get(key)
        .copied()
        .ok_or_else(|| StabilisError::MissingFeature {
            record: index,
            key: key.to_string(),
        })
}

/// Interpret a stored code; `0` means absent, anything else must lie in
/// `1..=max`.
fn code_value(index: usize, key: &str, value: f64, max: usize) -> Result<usize, StabilisError> {
    if value.fract() != 0.0 || value < 0.0 || value > max as f64 {
        return Err(StabilisError::InvalidEncoding(format!(
            "record {}: '{}' holds {} which is not a code in 0..={}",
            index, key, value, max
        )));
    }
    Ok(value as usize)
}

/// A code that must be present and non-zero (mutation residues).
fn required_code(
    index: usize,
    record: &NumericRecord,
    key: &str,
    max: usize,
) -> Result<usize, StabilisError> {
    let value = record.get(key).copied().unwrap_or(0.0);
    match code_value(index, key, value, max)? {
        0 => Err(StabilisError::InvalidEncoding(format!(
            "record {}: '{}' is absent and cannot be one-hot encoded",
            index, key
        ))),
        code => Ok(code),
    }
}

/// A code where a missing key is treated as absent.
fn optional_code(
    index: usize,
    record: &NumericRecord,
    key: &str,
    max: usize,
) -> Result<usize, StabilisError> {
    match record.get(key) {
        Some(&value) => code_value(index, key, value, max),
        None => Ok(0),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, f64)]) -> NumericRecord {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    fn ones(vector: &[f64]) -> Vec<usize> {
        vector
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 1.0)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn default_set_requires_spatial_frequencies() {
        let records = vec![record(&[("oldAA", 1.0), ("newAA", 8.0)])];
        let result = encode(&records, &FeatureSet::new(vec![]));
        assert!(matches!(result, Err(StabilisError::MissingFeature { .. })));
    }

    #[test]
    fn mutation_block_only() {
        let records = vec![record(&[("oldAA", 1.0), ("newAA", 8.0)])];
        let vectors = encode_groups(&records, &[]).expect("encode");
        assert_eq!(vectors[0].len(), 40);
        assert_eq!(ones(&vectors[0]), vec![0, 7 + 20]);
    }

    #[test]
    fn absent_mutation_code_is_invalid_encoding() {
        let records = vec![record(&[("oldAA", 0.0), ("newAA", 8.0)])];
        assert!(matches!(
            encode_groups(&records, &[]),
            Err(StabilisError::InvalidEncoding(_))
        ));
        let records = vec![record(&[("newAA", 8.0)])];
        assert!(encode_groups(&records, &[]).is_err());
    }

    #[test]
    fn window_block_layout() {
        let records = vec![record(&[
            ("oldAA", 1.0),
            ("newAA", 2.0),
            ("prevAA1", 3.0),
            ("nextAA1", 0.0),
            ("prevAA2", 0.0),
            ("nextAA2", 20.0),
        ])];
        let vectors = encode_groups(&records, &[FeatureGroup::Window(2)]).expect("encode");
        let v = &vectors[0];
        assert_eq!(v.len(), 40 + 80);
        // prevAA1 = 3 -> slot 0, index 2; nextAA2 = 20 -> slot 1, index 40 + 19 + 20
        assert_eq!(ones(&v[40..]), vec![2, 40 + 19 + 20]);
    }

    #[test]
    fn window_out_of_range_code_is_invalid() {
        let records = vec![record(&[("oldAA", 1.0), ("newAA", 2.0), ("prevAA1", 21.0)])];
        assert!(matches!(
            encode_groups(&records, &[FeatureGroup::Window(1)]),
            Err(StabilisError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn structure_block() {
        let records = vec![
            record(&[("oldAA", 1.0), ("newAA", 2.0), ("struc", 7.0)]),
            record(&[("oldAA", 1.0), ("newAA", 2.0), ("struc", 0.0)]),
        ];
        let vectors = encode_groups(&records, &[FeatureGroup::Structure]).expect("encode");
        assert_eq!(ones(&vectors[0][40..]), vec![6]);
        assert!(ones(&vectors[1][40..]).is_empty());
    }

    #[test]
    fn spatial_frequency_follows_residue_order() {
        let mut r = record(&[("oldAA", 1.0), ("newAA", 2.0)]);
        for (i, aa) in AminoAcid::ALL.iter().enumerate() {
            r.insert(format!("3D_freq_{}", aa.letter()), i as f64 / 100.0);
        }
        let vectors = encode_groups(&[r], &[FeatureGroup::SpatialFrequency]).expect("encode");
        assert_eq!(vectors[0].len(), 60);
        assert_eq!(vectors[0][40], 0.0);
        assert!((vectors[0][59] - 0.19).abs() < 1e-12);
    }

    #[test]
    fn missing_scalar_is_reported() {
        let records = vec![record(&[("oldAA", 1.0), ("newAA", 2.0)])];
        let result = encode_groups(&records, &[FeatureGroup::Scalar("asa".into())]);
        assert!(matches!(
            result,
            Err(StabilisError::MissingFeature { record: 0, .. })
        ));
    }

    #[test]
    fn group_parsing() {
        assert_eq!(FeatureGroup::parse("windowAA10").expect("w"), FeatureGroup::Window(10));
        assert_eq!(FeatureGroup::parse("3D_freq").expect("f"), FeatureGroup::SpatialFrequency);
        assert_eq!(FeatureGroup::parse("struc").expect("s"), FeatureGroup::Structure);
        assert_eq!(
            FeatureGroup::parse("asa").expect("a"),
            FeatureGroup::Scalar("asa".into())
        );
        assert!(FeatureGroup::parse("windowAAx").is_err());
        assert!(FeatureGroup::parse("windowAA0").is_err());
    }

    #[test]
    fn default_groups_use_key_union() {
        let records = vec![
            record(&[("oldAA", 1.0), ("newAA", 2.0), ("asa", 1.0), ("realddg", -1.0)]),
            record(&[
                ("oldAA", 1.0),
                ("newAA", 2.0),
                ("hydropathy", 0.5),
                ("prevAA1", 3.0),
                ("3D_freq_A", 0.1),
                ("struc", 2.0),
            ]),
        ];
        let groups = default_groups(&records, 4);
        assert_eq!(
            groups,
            vec![
                FeatureGroup::Scalar("asa".into()),
                FeatureGroup::Scalar("hydropathy".into()),
                FeatureGroup::Structure,
                FeatureGroup::Window(4),
                FeatureGroup::SpatialFrequency,
            ]
        );
    }

    #[test]
    fn width_is_sum_of_groups() {
        let groups = vec![
            FeatureGroup::Window(10),
            FeatureGroup::SpatialFrequency,
            FeatureGroup::Structure,
            FeatureGroup::Scalar("asa".into()),
        ];
        assert_eq!(vector_width(&groups), 40 + 400 + 20 + 7 + 1);
    }

    #[test]
    fn feature_set_serde_uses_names() {
        let set = FeatureSet::from_names(&["asa", "windowAA3"]).expect("parse");
        assert_eq!(set.groups()[1], FeatureGroup::Window(3));
        assert_eq!(String::from(set.groups()[1].clone()), "windowAA3");
    }
}
