//! # Record Store
//!
//! Holds the raw per-mutation records and their numeric counterparts.
//!
//! - Raw records are appended by `ingest` in encounter order
//! - `transform` derives numeric records exactly once
//! - Numeric records are immutable afterwards; fused labels travel as a
//!   side-channel through the ensemble, never through the store

use crate::encoder::{self, FeatureSet, FeatureVector};
use crate::primitives::{CHAIN_COLUMN, GROUND_TRUTH_KEY, MUTATION_COLUMN, PROTEIN_COLUMN};
use crate::rescale::rescale_record;
use crate::system::{Phase, PhaseTracker};
use crate::transform::transform_record;
use crate::{Stability, StabilisError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Raw textual record: column name → value.
pub type RawRecord = BTreeMap<String, String>;

/// Derived numeric record: feature key → value.
pub type NumericRecord = BTreeMap<String, f64>;

/// Identity of a record as it appears on the result boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordIdentity {
    pub protein: String,
    pub chain: String,
    pub mutation: String,
}

// =============================================================================
// GROUND TRUTH HELPERS
// =============================================================================

/// Measured ΔΔG of every record.
///
/// Fails with `MissingGroundTruth` on the first record without `realddg`.
pub fn expected_regression(records: &[NumericRecord]) -> Result<Vec<f64>, StabilisError> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            record
                .get(GROUND_TRUTH_KEY)
                .copied()
                .ok_or(StabilisError::MissingGroundTruth { record: i })
        })
        .collect()
}

/// Ground-truth label of every record (negative ΔΔG ⇒ stabilizing).
pub fn expected_classification(records: &[NumericRecord]) -> Result<Vec<Stability>, StabilisError> {
    Ok(expected_regression(records)?
        .into_iter()
        .map(Stability::from_ddg)
        .collect())
}

// =============================================================================
// RECORD STORE
// =============================================================================

/// Raw records, their numeric counterparts, and the column contract.
#[derive(Debug, Clone)]
pub struct RecordStore {
    header: Vec<String>,
    raw: Vec<RawRecord>,
    numeric: Vec<NumericRecord>,
    phase: PhaseTracker,
}

impl RecordStore {
    /// Create an empty store for the given header.
    ///
    /// The header must be non-empty and free of duplicate column names.
    pub fn new(header: Vec<String>) -> Result<Self, StabilisError> {
        if header.is_empty() || header.iter().all(String::is_empty) {
            return Err(StabilisError::malformed(0, "", "empty header"));
        }
        let mut seen = BTreeSet::new();
        for column in &header {
            if !seen.insert(column.as_str()) {
                return Err(StabilisError::malformed(0, column.clone(), "duplicate column"));
            }
        }
        Ok(Self {
            header,
            raw: Vec::new(),
            numeric: Vec::new(),
            phase: PhaseTracker::starting_at(Phase::Ingested),
        })
    }

    /// Build a store from CSV text (header row + data rows).
    ///
    /// Quoted fields may contain commas. Cells are trimmed and empty lines
    /// are skipped. A data row whose arity differs from the header fails
    /// with `MalformedInput` naming that row. The store is returned
    /// untransformed.
    pub fn from_csv(text: &str) -> Result<Self, StabilisError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let header = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();
        let mut store = Self::new(header)?;

        let rows = reader
            .records()
            .map(|row| row.map(|cells| cells.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()
            .map_err(csv_error)?;
        store.ingest(rows)?;
        Ok(store)
    }

    /// Append raw rows in encounter order.
    ///
    /// All rows are validated before any is appended; a row whose arity
    /// differs from the header fails with `MalformedInput`.
    pub fn ingest<I>(&mut self, rows: I) -> Result<usize, StabilisError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        self.phase.require(Phase::Ingested)?;

        let base = self.raw.len();
        let mut staged = Vec::new();
        for (offset, row) in rows.into_iter().enumerate() {
            if row.len() != self.header.len() {
                return Err(StabilisError::malformed(
                    base + offset,
                    "",
                    format!(
                        "row has {} columns, header declares {}",
                        row.len(),
                        self.header.len()
                    ),
                ));
            }
            staged.push(self.header.iter().cloned().zip(row).collect::<RawRecord>());
        }

        let count = staged.len();
        self.raw.extend(staged);
        tracing::debug!(rows = count, total = self.raw.len(), "ingested raw records");
        Ok(count)
    }

    /// Derive numeric records from every raw record. Callable exactly once.
    pub fn transform(&mut self) -> Result<(), StabilisError> {
        self.phase.require(Phase::Ingested).map_err(|_| {
            StabilisError::InvalidState("record store has already been transformed".to_string())
        })?;

        let mut numeric = Vec::with_capacity(self.raw.len());
        let mut missing_columns = BTreeSet::new();
        for (i, raw) in self.raw.iter().enumerate() {
            let mut record = transform_record(i, raw)?;
            missing_columns.extend(rescale_record(&mut record));
            numeric.push(record);
        }

        if !missing_columns.is_empty() && !numeric.is_empty() {
            tracing::warn!(
                columns = ?missing_columns,
                "catalogued columns absent from input, left unscaled"
            );
        }

        self.numeric = numeric;
        self.phase.advance(Phase::Transformed)?;
        Ok(())
    }

    /// Current lifecycle phase of the store.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.current()
    }

    /// Column contract.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of ingested records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Check if no record has been ingested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Raw records in input order.
    #[must_use]
    pub fn raw(&self) -> &[RawRecord] {
        &self.raw
    }

    /// Numeric records in input order; only available after `transform`.
    pub fn numeric(&self) -> Result<&[NumericRecord], StabilisError> {
        self.phase.require_at_least(Phase::Transformed)?;
        Ok(&self.numeric)
    }

    /// Encode every numeric record with `feature_set`.
    pub fn encode(&self, feature_set: &FeatureSet) -> Result<Vec<FeatureVector>, StabilisError> {
        encoder::encode(self.numeric()?, feature_set)
    }

    /// Ground-truth labels.
    pub fn expected_classification(&self) -> Result<Vec<Stability>, StabilisError> {
        self.require_ground_truth_column()?;
        expected_classification(self.numeric()?)
    }

    /// Ground-truth ΔΔG values.
    pub fn expected_regression(&self) -> Result<Vec<f64>, StabilisError> {
        self.require_ground_truth_column()?;
        expected_regression(self.numeric()?)
    }

    /// Whether the input declares a ground-truth column.
    #[must_use]
    pub fn has_ground_truth(&self) -> bool {
        self.header.iter().any(|c| c == GROUND_TRUTH_KEY)
    }

    /// Identity triple of every record, for the result boundary.
    #[must_use]
    pub fn identities(&self) -> Vec<RecordIdentity> {
        let field = |raw: &RawRecord, column: &str| raw.get(column).cloned().unwrap_or_default();
        self.raw
            .iter()
            .map(|raw| RecordIdentity {
                protein: field(raw, PROTEIN_COLUMN),
                chain: field(raw, CHAIN_COLUMN),
                mutation: field(raw, MUTATION_COLUMN),
            })
            .collect()
    }

    fn require_ground_truth_column(&self) -> Result<(), StabilisError> {
        if self.has_ground_truth() {
            Ok(())
        } else {
            Err(StabilisError::MissingGroundTruth { record: 0 })
        }
    }
}

/// Map a reader error onto the data row it occurred in (header excluded).
fn csv_error(err: csv::Error) -> StabilisError {
    let record = err
        .position()
        .map_or(0, |pos| pos.record().saturating_sub(1) as usize);
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => StabilisError::malformed(
            record,
            "",
            format!("row has {} columns, header declares {}", len, expected_len),
        ),
        _ => StabilisError::malformed(record, "", err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
