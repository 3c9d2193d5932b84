//! # Run Phases
//!
//! Lifecycle of one prediction run, from ingested raw records to fused
//! results.
//!
//! | Phase | Owner | Entered when |
//! |-------|-------|--------------|
//! | Ingested | `RecordStore` | header accepted, rows appended |
//! | Transformed | `RecordStore` | numeric records derived and rescaled |
//! | Classified | `EnsemblePipeline` | majority vote written to the label side-channel |
//! | Regressed | `EnsemblePipeline` | every specialist produced its gated output |
//! | Fused | `EnsemblePipeline` | pair averages computed, results emitted |
//!
//! Transitions are strictly forward and one step at a time. The label
//! side-channel is written exactly once per run, between `Transformed`
//! and `Classified`.

use crate::StabilisError;
use serde::{Deserialize, Serialize};

/// Phases of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Ingested,
    Transformed,
    Classified,
    Regressed,
    Fused,
}

impl Phase {
    /// Human readable phase name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Ingested => "ingested",
            Phase::Transformed => "transformed",
            Phase::Classified => "classified",
            Phase::Regressed => "regressed",
            Phase::Fused => "fused",
        }
    }

    /// Get the next phase, if any.
    #[must_use]
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Ingested => Some(Phase::Transformed),
            Phase::Transformed => Some(Phase::Classified),
            Phase::Classified => Some(Phase::Regressed),
            Phase::Regressed => Some(Phase::Fused),
            Phase::Fused => None,
        }
    }

    /// Check if this phase is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Fused)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// PHASE TRACKER
// =============================================================================

/// Guards the single-step forward progression of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTracker {
    current: Phase,
}

impl PhaseTracker {
    /// Start tracking at `phase`.
    #[must_use]
    pub const fn starting_at(phase: Phase) -> Self {
        Self { current: phase }
    }

    /// The phase reached so far.
    #[must_use]
    pub const fn current(&self) -> Phase {
        self.current
    }

    /// Move to `to`, which must be the direct successor of the current phase.
    pub fn advance(&mut self, to: Phase) -> Result<(), StabilisError> {
        if self.current.next() != Some(to) {
            return Err(StabilisError::InvalidState(format!(
                "cannot move from phase '{}' to '{}'",
                self.current, to
            )));
        }
        self.current = to;
        Ok(())
    }

    /// Fail unless the current phase is exactly `expected`.
    pub fn require(&self, expected: Phase) -> Result<(), StabilisError> {
        if self.current != expected {
            return Err(StabilisError::InvalidState(format!(
                "expected phase '{}', found '{}'",
                expected, self.current
            )));
        }
        Ok(())
    }

    /// Fail unless the current phase is `minimum` or later.
    pub fn require_at_least(&self, minimum: Phase) -> Result<(), StabilisError> {
        if self.current < minimum {
            return Err(StabilisError::InvalidState(format!(
                "phase '{}' not reached (current: '{}')",
                minimum, self.current
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
