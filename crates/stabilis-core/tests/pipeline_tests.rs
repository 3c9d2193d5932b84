//! # End-to-End Pipeline Tests
//!
//! CSV in, fused predictions out, through the standard roster with real
//! learners and on-disk artifact stores.

use stabilis_core::config::NetworkConfig;
use stabilis_core::{
    AminoAcid, CancellationToken, DirectoryArtifactStore, EnsemblePipeline, EvaluationReport,
    MemoryArtifactStore, Phase, PipelineConfig, RecordStore, RedbArtifactStore, Roster, RunMode,
    Stability, StabilisError,
};
use std::sync::Arc;

// =============================================================================
// FIXTURE
// =============================================================================

const PHYSICOCHEMICAL: &[&str] = stabilis_core::ensemble::PHYSICOCHEMICAL_FEATURES;
const RESIDUE: &[&str] = stabilis_core::ensemble::RESIDUE_FEATURES;

/// (mutation, struc, asa, realddg)
const ROWS: &[(&str, &str, f64, f64)] = &[
    ("A12G", "H", 0.05, -1.2),
    ("L45A", "E", 0.20, -2.6),
    ("K77R", "-", 0.35, -0.4),
    ("V30D", "T", 0.60, 1.8),
    ("W88S", "H", 0.80, 3.5),
    ("F19P", "S", 0.95, 0.9),
];

const RESIDUE_CYCLE: &str = "ARNDCEQGHILKMFPSTWYV";

fn header() -> Vec<String> {
    let mut columns: Vec<String> = ["protein", "chain", "mutation"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    columns.extend(PHYSICOCHEMICAL.iter().map(|s| s.to_string()));
    columns.extend(RESIDUE.iter().map(|s| s.to_string()));
    columns.extend(
        ["asa", "struc", "information_content", "3D_atom_numbers"]
            .iter()
            .map(|s| s.to_string()),
    );
    columns.extend(AminoAcid::ALL.iter().map(|aa| format!("3D_freq_{}", aa.letter())));
    for j in 1..=10 {
        columns.push(format!("prevAA{}", j));
        columns.push(format!("nextAA{}", j));
    }
    columns
}

fn fixture_csv(with_ground_truth: bool) -> String {
    let mut header = header();
    if with_ground_truth {
        header.push("realddg".to_string());
    }
    let mut text = header.join(",");
    text.push('\n');

    for (i, (mutation, struc, asa, ddg)) in ROWS.iter().enumerate() {
        let scale = (i + 1) as f64 / ROWS.len() as f64;
        let mut row = vec!["1XYZ".to_string(), "A".to_string(), mutation.to_string()];
        // Small values keep every rescaled column inside [0, 1]
        row.extend(PHYSICOCHEMICAL.iter().map(|_| format!("{:.3}", 0.5 * scale)));
        row.extend(RESIDUE.iter().map(|_| format!("{:.3}", 0.4 * scale)));
        row.push(asa.to_string());
        row.push(struc.to_string());
        row.push(format!("{:.3}", 4.0 * scale));
        row.push(format!("{}", 500 + 250 * i));
        row.extend((0..20).map(|k| format!("{:.3}", ((i + k) % 7) as f64 / 7.0)));
        for j in 1..=10 {
            let prev = if j > 8 {
                "-".to_string()
            } else {
                RESIDUE_CYCLE[(i * 3 + j) % 20..][..1].to_string()
            };
            let next = RESIDUE_CYCLE[(i * 5 + j * 2) % 20..][..1].to_string();
            row.push(prev);
            row.push(next);
        }
        if with_ground_truth {
            row.push(ddg.to_string());
        }
        text.push_str(&row.join(","));
        text.push('\n');
    }
    text
}

fn transformed(with_ground_truth: bool) -> RecordStore {
    let mut store = RecordStore::from_csv(&fixture_csv(with_ground_truth)).expect("parse fixture");
    store.transform().expect("transform fixture");
    store
}

/// Tighter network stopping rule so the tiny fixture is fitted.
fn config() -> PipelineConfig {
    PipelineConfig {
        network: NetworkConfig {
            classifier_target_error: 0.005,
            max_epochs: 3000,
            ..NetworkConfig::default()
        },
        ..PipelineConfig::default()
    }
}

fn pipeline(store: Arc<dyn stabilis_core::ArtifactStore>) -> EnsemblePipeline {
    let config = config();
    let roster = Roster::standard(&config).expect("standard roster");
    EnsemblePipeline::new(roster, store, config)
}

/// Two mutations whose every column sits at the bottom or the top of its
/// domain: A1G (ΔΔG −3.2) and G1A (ΔΔG 4.0).
fn extremes_csv() -> String {
    let header = header();
    let cell = |column: &str, at_max: bool| -> String {
        if column == "struc" {
            return if at_max { "S" } else { "-" }.to_string();
        }
        if column.starts_with("prevAA") || column.starts_with("nextAA") {
            return if at_max { "V" } else { "-" }.to_string();
        }
        if !at_max {
            return "0".to_string();
        }
        let max = stabilis_core::rescale::domain_of(column).map_or(1.0, |range| range.max);
        max.to_string()
    };

    let mut text = header.join(",");
    text.push_str(",realddg\n");
    for (mutation, ddg, at_max) in [("A1G", -3.2, false), ("G1A", 4.0, true)] {
        let mut row = vec!["1XYZ".to_string(), "A".to_string(), mutation.to_string()];
        row.extend(header[3..].iter().map(|column| cell(column, at_max)));
        row.push(ddg.to_string());
        text.push_str(&row.join(","));
        text.push('\n');
    }
    text
}

fn expected_labels() -> Vec<Stability> {
    ROWS.iter().map(|row| Stability::from_ddg(row.3)).collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[test]
fn fixture_encodes_to_declared_widths() {
    let store = transformed(true);
    let roster = Roster::standard(&config()).expect("roster");
    for member in roster.members() {
        let feature_set = match (member.as_classifier(), member.as_regressor()) {
            (Some(c), _) => c.feature_set().clone(),
            (_, Some(r)) => r.feature_set().clone(),
            (None, None) => unreachable!("a member is either kind"),
        };
        let width = stabilis_core::encoder::vector_width(feature_set.groups());
        let vectors = store.encode(&feature_set).expect("encode");
        assert_eq!(vectors.len(), ROWS.len());
        assert!(vectors.iter().all(|v| v.len() == width), "{}", member.id());
    }
}

#[test]
fn train_predicts_training_labels_and_ranges() {
    let records = transformed(true);
    let mut pipeline = pipeline(Arc::new(MemoryArtifactStore::new()));
    let predictions = pipeline
        .run(&records, RunMode::Train, &CancellationToken::new())
        .expect("train run");

    assert_eq!(pipeline.phase(), Phase::Fused);
    assert_eq!(predictions.len(), ROWS.len());

    let labels: Vec<Stability> = predictions.iter().map(|p| p.label).collect();
    assert_eq!(labels, expected_labels());

    for (prediction, row) in predictions.iter().zip(ROWS) {
        assert_eq!(prediction.mutation, row.0);
        assert_eq!(prediction.protein, "1XYZ");
        match prediction.label {
            Stability::Stabilizing => assert!((-11.0..=0.0).contains(&prediction.ddg)),
            Stability::Destabilizing => assert!((0.0..=31.0).contains(&prediction.ddg)),
        }
    }

    let report = EvaluationReport::compute(
        &records.expected_classification().expect("labels"),
        &labels,
        &records.expected_regression().expect("ddg"),
        &predictions.iter().map(|p| p.ddg).collect::<Vec<_>>(),
    )
    .expect("report");
    assert_eq!(report.accuracy, 1.0);
}

#[test]
fn domain_extremes_under_default_config() {
    let mut records = RecordStore::from_csv(&extremes_csv()).expect("parse extremes");
    records.transform().expect("transform extremes");

    for seed in 0..8 {
        let config = PipelineConfig {
            seed,
            ..PipelineConfig::default()
        };
        let roster = Roster::standard(&config).expect("standard roster");
        let predictions =
            EnsemblePipeline::new(roster, Arc::new(MemoryArtifactStore::new()), config)
                .run(&records, RunMode::Train, &CancellationToken::new())
                .expect("train run");

        let labels: Vec<Stability> = predictions.iter().map(|p| p.label).collect();
        assert_eq!(
            labels,
            vec![Stability::Stabilizing, Stability::Destabilizing],
            "seed {}",
            seed
        );
        assert!(
            (-11.0..=0.0).contains(&predictions[0].ddg),
            "seed {}: {}",
            seed,
            predictions[0].ddg
        );
        assert!(
            (0.0..=31.0).contains(&predictions[1].ddg),
            "seed {}: {}",
            seed,
            predictions[1].ddg
        );
    }
}

#[test]
fn persisted_models_reproduce_predictions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let training = transformed(true);

    let trained = pipeline(Arc::new(
        DirectoryArtifactStore::open(dir.path()).expect("open dir"),
    ))
    .run(&training, RunMode::Train, &CancellationToken::new())
    .expect("train");

    // Fresh pipeline, fresh store handle, unlabelled input
    let unlabelled = transformed(false);
    let predicted = pipeline(Arc::new(
        DirectoryArtifactStore::open(dir.path()).expect("reopen dir"),
    ))
    .run(&unlabelled, RunMode::Predict, &CancellationToken::new())
    .expect("predict");

    assert_eq!(predicted, trained);
}

#[test]
fn redb_backend_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("models.redb");
    let records = transformed(true);

    let trained = pipeline(Arc::new(RedbArtifactStore::open(&path).expect("open")))
        .run(&records, RunMode::Train, &CancellationToken::new())
        .expect("train");
    let evaluated = pipeline(Arc::new(RedbArtifactStore::open(&path).expect("reopen")))
        .run(&records, RunMode::Evaluate, &CancellationToken::new())
        .expect("evaluate");

    assert_eq!(evaluated, trained);
}

#[test]
fn predict_without_models_is_model_not_found() {
    let records = transformed(false);
    let err = pipeline(Arc::new(MemoryArtifactStore::new()))
        .run(&records, RunMode::Predict, &CancellationToken::new())
        .expect_err("no models");

    match err {
        StabilisError::MemberFailed { member, source, .. } => {
            assert_eq!(member, "svm-0");
            assert!(matches!(*source, StabilisError::ModelNotFound(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn training_without_ground_truth_fails() {
    let records = transformed(false);
    let err = pipeline(Arc::new(MemoryArtifactStore::new()))
        .run(&records, RunMode::Train, &CancellationToken::new())
        .expect_err("no realddg");
    assert!(matches!(
        err,
        StabilisError::MemberFailed { ref source, .. }
            if matches!(**source, StabilisError::MissingGroundTruth { .. })
    ));
}
