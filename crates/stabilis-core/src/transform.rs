//! # Raw → Numeric Transform
//!
//! Deterministic per-column conversion of one raw record:
//! - `protein`, `chain`: dropped
//! - `mutation`: decoded into `oldAA` / `newAA` residue codes
//! - `prevAA<k>` / `nextAA<k>`: residue code, `0` for `-`
//! - `struc`: DSSP code, `0` for `-`
//! - everything else: locale-invariant float
//!
//! Range rescaling runs afterwards (see [`crate::rescale`]).

use crate::primitives::{
    ABSENT_SENTINEL, CHAIN_COLUMN, MUTATION_COLUMN, NEW_AA_KEY, NEXT_AA_PREFIX, OLD_AA_KEY,
    PREV_AA_PREFIX, PROTEIN_COLUMN, STRUCTURE_KEY,
};
use crate::record::{NumericRecord, RawRecord};
use crate::{AminoAcid, SecondaryStructure, StabilisError};

/// Convert one raw record into its numeric counterpart (before rescaling).
///
/// `index` is the record's position, used only for error reporting.
pub fn transform_record(index: usize, raw: &RawRecord) -> Result<NumericRecord, StabilisError> {
    let mut numeric = NumericRecord::new();

    for (column, value) in raw {
        let column = column.as_str();
        if column == PROTEIN_COLUMN || column == CHAIN_COLUMN {
            continue;
        }

        if column == MUTATION_COLUMN {
            let (old, new) = decode_mutation(index, value)?;
            numeric.insert(OLD_AA_KEY.to_string(), f64::from(old.code()));
            numeric.insert(NEW_AA_KEY.to_string(), f64::from(new.code()));
        } else if is_window_column(column) {
            numeric.insert(column.to_string(), decode_neighbour(index, column, value)?);
        } else if column == STRUCTURE_KEY {
            numeric.insert(column.to_string(), decode_structure(index, value)?);
        } else {
            let parsed = value.parse::<f64>().map_err(|e| {
                StabilisError::malformed(
                    index,
                    column,
                    format!("'{}' is not a number: {}", value, e),
                )
            })?;
            numeric.insert(column.to_string(), parsed);
        }
    }

    Ok(numeric)
}

/// Check whether a column holds a sequence-window neighbour.
#[must_use]
pub fn is_window_column(column: &str) -> bool {
    column.starts_with(PREV_AA_PREFIX) || column.starts_with(NEXT_AA_PREFIX)
}

/// Split a mutation descriptor like `A123G` into (wild type, mutant).
pub fn decode_mutation(
    index: usize,
    descriptor: &str,
) -> Result<(AminoAcid, AminoAcid), StabilisError> {
    let residue = |c: Option<char>| {
        c.and_then(AminoAcid::from_letter).ok_or_else(|| {
            StabilisError::malformed(
                index,
                MUTATION_COLUMN,
                format!("'{}' does not start and end with a residue letter", descriptor),
            )
        })
    };
    let old = residue(descriptor.chars().next())?;
    let new = residue(descriptor.chars().last())?;
    Ok((old, new))
}

fn decode_neighbour(index: usize, column: &str, value: &str) -> Result<f64, StabilisError> {
    if value == ABSENT_SENTINEL {
        return Ok(0.0);
    }
    let mut chars = value.chars();
    match (chars.next().and_then(AminoAcid::from_letter), chars.next()) {
        (Some(aa), None) => Ok(f64::from(aa.code())),
        _ => Err(StabilisError::malformed(
            index,
            column,
            format!("'{}' is not a residue letter", value),
        )),
    }
}

fn decode_structure(index: usize, value: &str) -> Result<f64, StabilisError> {
    if value == ABSENT_SENTINEL {
        return Ok(0.0);
    }
    let mut chars = value.chars();
    match (chars.next().and_then(SecondaryStructure::from_letter), chars.next()) {
        (Some(class), None) => Ok(f64::from(class.code())),
        _ => Err(StabilisError::malformed(
            index,
            STRUCTURE_KEY,
            format!("'{}' is not a DSSP class", value),
        )),
    }
}

// =============================================================================
// TESTS
// =============================================================================
