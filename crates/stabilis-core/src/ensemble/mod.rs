//! # Ensemble Orchestrator
//!
//! Drives one run of a roster over a transformed record store:
//!
//! ```text
//! init ─► [train] ─► classify ─► vote ─► regress ─► pair average
//!                    Classified          Regressed   Fused
//! ```
//!
//! Members of one stage are independent and may run on the rayon pool.
//! Every stage is a barrier: fusion only sees complete member outputs,
//! and the first failing member in roster order aborts the run.

mod fusion;
mod roster;

pub use fusion::{majority_vote, pair_average};
pub use roster::{PHYSICOCHEMICAL_FEATURES, RESIDUE_FEATURES, Roster, STRUCTURAL_FEATURES};

use crate::config::PipelineConfig;
use crate::predictor::{InitMode, PredictorHandle, PredictorId};
use crate::record::RecordStore;
use crate::storage::ArtifactStore;
use crate::system::{CancellationToken, Phase, PhaseTracker};
use crate::{Stability, StabilisError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a run does with the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Fit and persist every member, then predict the same records.
    Train,
    /// Load persisted members and predict.
    Predict,
    /// Like `Predict`; the caller scores the result against ground truth.
    Evaluate,
}

impl RunMode {
    fn init_mode(self) -> InitMode {
        match self {
            Self::Train => InitMode::Train,
            Self::Predict | Self::Evaluate => InitMode::Load,
        }
    }
}

/// One fused result, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub protein: String,
    pub chain: String,
    pub mutation: String,
    pub label: Stability,
    pub ddg: f64,
}

/// Context of one or more runs of a roster against an artifact store.
pub struct EnsemblePipeline {
    roster: Roster,
    store: Arc<dyn ArtifactStore>,
    config: PipelineConfig,
    phase: PhaseTracker,
    labels: Vec<Stability>,
}

impl std::fmt::Debug for EnsemblePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsemblePipeline")
            .field("roster", &self.roster)
            .field("phase", &self.phase.current())
            .finish_non_exhaustive()
    }
}

impl EnsemblePipeline {
    #[must_use]
    pub fn new(roster: Roster, store: Arc<dyn ArtifactStore>, config: PipelineConfig) -> Self {
        Self {
            roster,
            store,
            config,
            phase: PhaseTracker::starting_at(Phase::Ingested),
            labels: Vec::new(),
        }
    }

    /// Run the roster over `records` and return one prediction per record.
    ///
    /// `records` must have been transformed. No partial results: any
    /// member failure aborts the run.
    pub fn run(
        &mut self,
        records: &RecordStore,
        mode: RunMode,
        cancel: &CancellationToken,
    ) -> Result<Vec<Prediction>, StabilisError> {
        let numeric = records.numeric()?;
        self.phase = PhaseTracker::starting_at(Phase::Transformed);
        self.labels.clear();

        let parallel = self.config.parallel;
        let store = Arc::clone(&self.store);
        let store = store.as_ref();
        tracing::info!(
            ?mode,
            records = numeric.len(),
            members = self.roster.len(),
            parallel,
            "ensemble run started"
        );

        cancel.check()?;
        let init_mode = mode.init_mode();
        run_stage_mut("init", self.roster.members_mut(), parallel, |member| {
            member.init(init_mode, store)
        })?;

        if mode == RunMode::Train {
            cancel.check()?;
            run_stage_mut("train", self.roster.members_mut(), parallel, |member| {
                member.train(numeric, store, cancel)
            })?;
        }

        cancel.check()?;
        let votes = collect_stage("classify", self.roster.members(), parallel, |member| {
            member.as_classifier().map(|c| c.run(numeric))
        })?;
        let labels = majority_vote(&votes, numeric.len());
        self.phase.advance(Phase::Classified)?;

        cancel.check()?;
        let outputs = collect_stage("regress", self.roster.members(), parallel, |member| {
            member
                .as_regressor()
                .map(|r| r.run(numeric, &labels).map(|values| (r.polarity(), values)))
        })?;
        self.phase.advance(Phase::Regressed)?;

        let ddg = pair_average(&outputs, &labels);
        self.phase.advance(Phase::Fused)?;

        let predictions = records
            .identities()
            .into_iter()
            .zip(labels.iter().zip(ddg))
            .map(|(identity, (label, ddg))| Prediction {
                protein: identity.protein,
                chain: identity.chain,
                mutation: identity.mutation,
                label: *label,
                ddg,
            })
            .collect::<Vec<_>>();
        self.labels = labels;

        tracing::info!(
            predictions = predictions.len(),
            stabilizing = self
                .labels
                .iter()
                .filter(|l| **l == Stability::Stabilizing)
                .count(),
            "ensemble run finished"
        );
        Ok(predictions)
    }

    /// Fused labels of the last run (empty before the first run).
    #[must_use]
    pub fn labels(&self) -> &[Stability] {
        &self.labels
    }

    /// Phase reached by the last run.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.current()
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

// =============================================================================
// STAGE EXECUTION
// =============================================================================

/// Attach stage and member to an error; cancellation passes through as is.
fn member_failure(stage: &str, member: PredictorId, error: StabilisError) -> StabilisError {
    match error {
        StabilisError::Cancelled => StabilisError::Cancelled,
        source => {
            tracing::error!(stage, %member, error = %source, "member failed");
            StabilisError::MemberFailed {
                stage: stage.to_string(),
                member: member.to_string(),
                source: Box::new(source),
            }
        }
    }
}

/// Apply `op` to every member; report the first failure in roster order.
fn run_stage_mut<F>(
    stage: &str,
    members: &mut [PredictorHandle],
    parallel: bool,
    op: F,
) -> Result<(), StabilisError>
where
    F: Fn(&mut PredictorHandle) -> Result<(), StabilisError> + Send + Sync,
{
    let results: Vec<(PredictorId, Result<(), StabilisError>)> = if parallel {
        members
            .par_iter_mut()
            .map(|member| (member.id(), op(member)))
            .collect()
    } else {
        members
            .iter_mut()
            .map(|member| (member.id(), op(member)))
            .collect()
    };

    for (member, result) in results {
        result.map_err(|e| member_failure(stage, member, e))?;
    }
    tracing::debug!(stage, members = members.len(), "stage complete");
    Ok(())
}

/// Collect the output of every member for which `op` applies, in roster
/// order; report the first failure in roster order.
fn collect_stage<T, F>(
    stage: &str,
    members: &[PredictorHandle],
    parallel: bool,
    op: F,
) -> Result<Vec<T>, StabilisError>
where
    T: Send,
    F: Fn(&PredictorHandle) -> Option<Result<T, StabilisError>> + Send + Sync,
{
    let results: Vec<(PredictorId, Option<Result<T, StabilisError>>)> = if parallel {
        members
            .par_iter()
            .map(|member| (member.id(), op(member)))
            .collect()
    } else {
        members
            .iter()
            .map(|member| (member.id(), op(member)))
            .collect()
    };

    let mut outputs = Vec::with_capacity(results.len());
    for (member, result) in results {
        if let Some(result) = result {
            outputs.push(result.map_err(|e| member_failure(stage, member, e))?);
        }
    }
    tracing::debug!(stage, outputs = outputs.len(), "stage complete");
    Ok(outputs)
}

// =============================================================================
// TESTS
// =============================================================================
