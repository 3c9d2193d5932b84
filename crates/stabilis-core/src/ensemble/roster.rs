//! Roster composition and the standard reference roster.

use crate::config::PipelineConfig;
use crate::encoder::FeatureSet;
use crate::predictor::{
    ForestClassifier, NetworkClassifier, NetworkRegressor, PredictorHandle, PredictorId,
    PredictorKind, SvmClassifier,
};
use crate::primitives::{SPECIALISTS_PER_POLARITY, WINDOW_GROUP_PREFIX};
use crate::{Stability, StabilisError};
use std::collections::BTreeSet;

/// Physicochemical descriptors of the substitution, as produced by the
/// augmentation step.
pub const PHYSICOCHEMICAL_FEATURES: &[&str] = &[
    "molecular_weight", "K0", "H_t", "H_p", "P", "pH_i", "pK", "B_l", "R_f", "mi", "H_nc",
    "E_sm", "E_l", "E_t", "P_alfa", "P_beta", "P_t", "P_c", "C_alfa", "F", "B_r", "R_a", "N_s",
    "alfa_n", "alfa_c", "alfa_m", "V0", "N_m", "N_l", "H_gm", "ASA_D", "ASA_N", "dASA", "dG_h",
    "G_hD", "G_hN", "dH_h", "TdS_h", "dC_ph", "dG_c", "dH_c", "TdS_c", "dG", "dH", "TdS", "v",
    "s", "f",
];

/// Residue-level descriptors.
pub const RESIDUE_FEATURES: &[&str] = &[
    "ECI",
    "ISA",
    "hydropathy",
    "aromatic",
    "aliphatic",
    "sidechain_hydro",
    "vnwaals_volume",
];

/// Structural context of the mutated position.
pub const STRUCTURAL_FEATURES: &[&str] = &[
    "asa",
    "struc",
    "information_content",
    "3D_atom_numbers",
    "3D_freq",
];

/// An ordered set of roster members satisfying the fusion assumptions.
#[derive(Debug)]
pub struct Roster {
    members: Vec<PredictorHandle>,
}

impl Roster {
    /// Validate and wrap `members`.
    ///
    /// Requires at least one classifier, exactly two regressors per
    /// polarity and distinct identifiers.
    pub fn new(members: Vec<PredictorHandle>) -> Result<Self, StabilisError> {
        let classifiers = members
            .iter()
            .filter(|m| m.as_classifier().is_some())
            .count();
        if classifiers == 0 {
            return Err(StabilisError::InvalidRoster(
                "at least one classifier is required".to_string(),
            ));
        }

        for polarity in [Stability::Stabilizing, Stability::Destabilizing] {
            let count = members
                .iter()
                .filter_map(PredictorHandle::as_regressor)
                .filter(|r| r.polarity() == polarity)
                .count();
            if count != SPECIALISTS_PER_POLARITY {
                return Err(StabilisError::InvalidRoster(format!(
                    "{} {} regressors, exactly {} required",
                    count, polarity, SPECIALISTS_PER_POLARITY
                )));
            }
        }

        let mut ids = BTreeSet::new();
        for member in &members {
            if !ids.insert(member.id()) {
                return Err(StabilisError::InvalidRoster(format!(
                    "duplicate member {}",
                    member.id()
                )));
            }
        }

        Ok(Self { members })
    }

    /// SVM, random forest and three perceptrons voting; two perceptron
    /// specialists per polarity for ΔΔG.
    pub fn standard(config: &PipelineConfig) -> Result<Self, StabilisError> {
        let window = format!("{}{}", WINDOW_GROUP_PREFIX, config.window_size);

        let classifier_features = FeatureSet::from_names(
            &[
                "asa",
                "struc",
                "information_content",
                "3D_atom_numbers",
                "3D_freq",
                window.as_str(),
            ],
        )?;
        let forest_features = FeatureSet::from_names(
            &[RESIDUE_FEATURES, STRUCTURAL_FEATURES].concat(),
        )?;
        let mut stabilizing_names: Vec<&str> = Vec::new();
        stabilizing_names.extend_from_slice(PHYSICOCHEMICAL_FEATURES);
        stabilizing_names.extend_from_slice(RESIDUE_FEATURES);
        stabilizing_names.extend_from_slice(STRUCTURAL_FEATURES);
        stabilizing_names.push(&window);
        let stabilizing_features = FeatureSet::from_names(&stabilizing_names)?;
        let destabilizing_features =
            FeatureSet::from_names(&[RESIDUE_FEATURES, STRUCTURAL_FEATURES].concat())?;

        let mut members = vec![
            PredictorHandle::Classification(Box::new(SvmClassifier::new(
                PredictorId::new(PredictorKind::Svm, 0),
                classifier_features.clone(),
                config,
            ))),
            PredictorHandle::Classification(Box::new(ForestClassifier::new(
                PredictorId::new(PredictorKind::RandomForest, 0),
                forest_features,
                config,
            ))),
        ];
        for ordinal in 0..3 {
            members.push(PredictorHandle::Classification(Box::new(
                NetworkClassifier::new(
                    PredictorId::new(PredictorKind::NeuralNetwork, ordinal),
                    classifier_features.clone(),
                    config,
                ),
            )));
        }

        let specialists = [
            (Stability::Destabilizing, &destabilizing_features),
            (Stability::Destabilizing, &destabilizing_features),
            (Stability::Stabilizing, &stabilizing_features),
            (Stability::Stabilizing, &stabilizing_features),
        ];
        for (ordinal, (polarity, features)) in specialists.into_iter().enumerate() {
            members.push(PredictorHandle::Regression(Box::new(NetworkRegressor::new(
                PredictorId::new(PredictorKind::NeuralNetworkRegression, ordinal),
                polarity,
                features.clone(),
                config,
            ))));
        }

        Self::new(members)
    }

    /// Members in roster order.
    #[must_use]
    pub fn members(&self) -> &[PredictorHandle] {
        &self.members
    }

    pub(crate) fn members_mut(&mut self) -> &mut [PredictorHandle] {
        &mut self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
