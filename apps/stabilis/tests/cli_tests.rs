//! Integration tests for the CLI surface: argument parsing, configuration
//! layering, input loading and prediction output.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use stabilis::cli::{
    Cli, Commands, PREDICTION_HEADER, cmd_evaluate, cmd_predict, format_predictions_csv,
    load_records, open_store,
};
use stabilis::config::{AppConfig, Backend, CliOverrides};
use stabilis_core::{Prediction, Stability, StabilisError};
use std::io::Write;
use std::path::Path;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn write_file(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create file");
    file.write_all(text.as_bytes()).expect("write file");
    path
}

fn prediction(mutation: &str, label: Stability, ddg: f64) -> Prediction {
    Prediction {
        protein: "1ABC".to_string(),
        chain: "A".to_string(),
        mutation: mutation.to_string(),
        label,
        ddg,
    }
}

// =============================================================================
// ARGUMENT PARSING
// =============================================================================

#[test]
fn test_parse_predict_with_globals() {
    let cli = Cli::try_parse_from([
        "stabilis",
        "--backend",
        "redb",
        "--models",
        "trained.redb",
        "predict",
        "-i",
        "in.csv",
        "-o",
        "out.csv",
    ])
    .expect("parse");

    assert_eq!(cli.backend.as_deref(), Some("redb"));
    match cli.command {
        Commands::Predict { input, output } => {
            assert_eq!(input, Path::new("in.csv"));
            assert_eq!(output.as_deref(), Some(Path::new("out.csv")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_rejects_unknown_backend() {
    let result = Cli::try_parse_from(["stabilis", "--backend", "sqlite", "config"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_requires_input() {
    assert!(Cli::try_parse_from(["stabilis", "train"]).is_err());
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = AppConfig::from_toml(
        r#"
        backend = "redb"

        [pipeline]
        window_size = 6

        [pipeline.forest]
        trees = 5
        "#,
    )
    .expect("parse");

    let defaults = AppConfig::default();
    assert_eq!(config.backend, Backend::Redb);
    assert_eq!(config.models, defaults.models);
    assert_eq!(config.pipeline.window_size, 6);
    assert_eq!(config.pipeline.forest.trees, 5);
    assert_eq!(config.pipeline.forest.max_depth, defaults.pipeline.forest.max_depth);
    assert_eq!(config.pipeline.network, defaults.pipeline.network);
}

#[test]
fn test_cli_overrides_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        dir.path(),
        "stabilis.toml",
        "models = \"from-file\"\nbackend = \"redb\"\n",
    );

    let overrides = CliOverrides {
        models: Some("from-cli".into()),
        backend: None,
    };
    let config = AppConfig::load(Some(&path), &overrides).expect("load");
    assert_eq!(config.models, Path::new("from-cli"));
    assert_eq!(config.backend, Backend::Redb);
}

#[test]
fn test_invalid_config_values_rejected() {
    let config = AppConfig::from_toml("[pipeline]\nwindow_size = 0\n").expect("parse");
    assert!(config.validate().is_err());

    assert!(AppConfig::from_toml("backend = \"tape\"").is_err());
}

#[test]
fn test_config_renders_and_reparses() {
    let config = AppConfig::default();
    let text = config.to_toml().expect("render");
    assert_eq!(AppConfig::from_toml(&text).expect("reparse"), config);
}

// =============================================================================
// INPUT AND OUTPUT
// =============================================================================

#[test]
fn test_load_records_transforms_input() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        dir.path(),
        "input.csv",
        "protein,chain,mutation,asa,realddg\n1ABC,A,A12G,0.3,-1.0\n1ABC,A,L7P,0.6,2.5\n",
    );

    let records = load_records(&path).expect("load");
    assert_eq!(records.len(), 2);
    assert!(records.has_ground_truth());
    assert_eq!(
        records.expected_classification().expect("labels"),
        vec![Stability::Stabilizing, Stability::Destabilizing]
    );
}

#[test]
fn test_load_records_rejects_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    assert!(matches!(load_records(dir.path()), Err(StabilisError::Io(_))));
}

#[test]
fn test_prediction_csv_layout() {
    let text = format_predictions_csv(&[
        prediction("A12G", Stability::Stabilizing, -1.5),
        prediction("L7P", Stability::Destabilizing, 2.25),
    ])
    .expect("format");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], PREDICTION_HEADER);
    assert_eq!(lines[1], "1ABC,A,A12G,1,-1.5");
    assert_eq!(lines[2], "1ABC,A,L7P,0,2.25");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_prediction_csv_quotes_commas() {
    let mut odd = prediction("A12G", Stability::Stabilizing, -0.5);
    odd.protein = "1ABC,copy".to_string();
    let text = format_predictions_csv(&[odd]).expect("format");
    assert_eq!(text.lines().nth(1), Some("\"1ABC,copy\",A,A12G,1,-0.5"));

    // Output reads back through the same parser as input
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(dir.path(), "predictions.csv", &text);
    let records = load_records(&path).expect("reload");
    assert_eq!(records.identities()[0].protein, "1ABC,copy");
}

#[test]
fn test_quoted_input_field_is_one_cell() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        dir.path(),
        "input.csv",
        "protein,chain,mutation,asa\n\"1ABC,2\",A,A12G,0.3\n",
    );
    let records = load_records(&path).expect("load");
    assert_eq!(records.len(), 1);
    assert_eq!(records.identities()[0].protein, "1ABC,2");
}

#[test]
fn test_ragged_input_reports_row() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        dir.path(),
        "input.csv",
        "protein,chain,mutation,asa\n1ABC,A,A12G,0.3\n1ABC,A,L7P\n",
    );
    assert!(matches!(
        load_records(&path),
        Err(StabilisError::MalformedInput { record: 1, .. })
    ));
}

#[test]
fn test_redb_backend_inside_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = AppConfig {
        models: dir.path().to_path_buf(),
        backend: Backend::Redb,
        ..AppConfig::default()
    };
    let store = open_store(&config).expect("open");
    assert!(!store.contains("svm-0").expect("contains"));
    assert!(dir.path().join("models.redb").is_file());
}

// =============================================================================
// COMMANDS
// =============================================================================

#[tokio::test]
async fn test_predict_without_models_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_file(
        dir.path(),
        "input.csv",
        "protein,chain,mutation,asa\n1ABC,A,A12G,0.3\n",
    );
    let config = AppConfig {
        models: dir.path().join("models"),
        ..AppConfig::default()
    };

    let err = cmd_predict(&config, &input, None, false)
        .await
        .expect_err("no trained models");
    match err {
        StabilisError::MemberFailed { source, .. } => {
            assert!(matches!(*source, StabilisError::ModelNotFound(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_evaluate_requires_ground_truth() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_file(
        dir.path(),
        "input.csv",
        "protein,chain,mutation,asa\n1ABC,A,A12G,0.3\n",
    );
    let config = AppConfig {
        models: dir.path().join("models"),
        ..AppConfig::default()
    };

    let err = cmd_evaluate(&config, &input, None, false)
        .await
        .expect_err("unlabelled input");
    assert!(matches!(err, StabilisError::MissingGroundTruth { .. }));
}
