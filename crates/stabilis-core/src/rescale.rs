//! # Range Rescaling
//!
//! Linear range mapping and the empirical domain table applied to
//! physicochemical columns right after the raw → numeric transform.

use crate::record::NumericRecord;
use serde::{Deserialize, Serialize};

/// A closed numeric interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainRange {
    pub min: f64,
    pub max: f64,
}

impl DomainRange {
    /// The unit interval `[0, 1]`.
    pub const UNIT: DomainRange = DomainRange { min: 0.0, max: 1.0 };

    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Width of the interval.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    /// Check membership (inclusive on both ends).
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Map `value` linearly from `self` into `to`.
    ///
    /// A degenerate source interval maps everything to `to.min`.
    #[must_use]
    pub fn scale_to(&self, value: f64, to: &DomainRange) -> f64 {
        let len = self.length();
        if len == 0.0 {
            return to.min;
        }
        (value - self.min) * to.length() / len + to.min
    }

    /// Map a value of this range into `[0, 1]`.
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        self.scale_to(value, &Self::UNIT)
    }

    /// Map a value of `[0, 1]` back into this range.
    #[must_use]
    pub fn denormalize(&self, unit_value: f64) -> f64 {
        Self::UNIT.scale_to(unit_value, self)
    }
}

// =============================================================================
// DOMAIN CATALOGUE
// =============================================================================

/// Empirical domain maxima of the rescaled columns; every minimum is 0.
///
/// Columns outside this table (window neighbours, structure codes,
/// per-residue frequencies, solvent accessibility flags) are left as-is.
pub const RESCALE_CATALOGUE: &[(&str, f64)] = &[
    ("molecular_weight", 130.0),
    ("K0", 13.0),
    ("H_t", 4.0),
    ("H_p", 4.5),
    ("P", 52.0),
    ("pH_i", 8.0),
    ("pK", 1.1),
    ("B_l", 18.5),
    ("R_f", 16.0),
    ("mi", 43.0),
    ("H_nc", 4.0),
    ("E_sm", 10.5),
    ("E_l", 4.2),
    ("P_beta", 1.4),
    ("P_t", 1.1),
    ("P_c", 1.1),
    ("C_alfa", 48.0),
    ("R_a", 6.0),
    ("N_s", 3.0),
    ("alfa_n", 2.0),
    ("alfa_c", 2.0),
    ("alfa_m", 2.3),
    ("V0", 101.0),
    ("N_l", 3.0),
    ("H_gm", 4.1),
    ("ASA_D", 137.0),
    ("ASA_N", 90.0),
    ("dASA", 124.0),
    ("dG_h", 6.3),
    ("G_hD", 13.4),
    ("G_hN", 7.1),
    ("dH_h", 9.3),
    ("TdS_h", 4.4),
    ("dC_ph", 39.3),
    ("dG_c", 7.0),
    ("dH_c", 13.2),
    ("TdS_c", 8.4),
    ("dG", 2.9),
    ("dH", 11.3),
    ("TdS", 8.4),
    ("v", 10.0),
    ("s", 5.0),
    ("f", 5.0),
    ("ECI", 1.7),
    ("ISA", 172.0),
    ("hydropathy", 2.5),
    ("sidechain_hydro", 155.0),
    ("information_content", 4.5),
    ("vnwaals_volume", 115.0),
    ("3D_atom_numbers", 4000.0),
];

/// Domain range of a catalogued column.
#[must_use]
pub fn domain_of(column: &str) -> Option<DomainRange> {
    RESCALE_CATALOGUE
        .iter()
        .find(|(name, _)| *name == column)
        .map(|&(_, max)| DomainRange::new(0.0, max))
}

/// Rescale every catalogued column present in `record` into `[0, 1]`.
///
/// Returns the catalogued columns that were absent.
pub fn rescale_record(record: &mut NumericRecord) -> Vec<&'static str> {
    let mut missing = Vec::new();
    for &(column, max) in RESCALE_CATALOGUE {
        match record.get_mut(column) {
            Some(value) => *value = DomainRange::new(0.0, max).normalize(*value),
            None => missing.push(column),
        }
    }
    missing
}
