//! # CLI Command Implementations
//!
//! Each command loads its input, builds the standard roster, and runs the
//! ensemble on a blocking worker. Ctrl+C cancels the run between stages.

use crate::config::{AppConfig, Backend};
use stabilis_core::{
    ArtifactStore, CancellationToken, DirectoryArtifactStore, EnsemblePipeline, EvaluationReport,
    Prediction, RecordStore, RedbArtifactStore, Roster, RunMode, StabilisError,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum size of an input CSV (200 MB).
const MAX_INPUT_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// File name used inside a directory given to the redb backend.
const REDB_FILE_NAME: &str = "models.redb";

/// Header of the prediction CSV.
pub const PREDICTION_HEADER: &str = "protein,chain,mutation,stabilization,ddg";

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), StabilisError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StabilisError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(StabilisError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, StabilisError> {
    let canonical = path.canonicalize().map_err(|e| {
        StabilisError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(StabilisError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent of an output path, keeping the file name.
fn validate_output_path(path: &Path) -> Result<PathBuf, StabilisError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        StabilisError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(StabilisError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| StabilisError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SHARED STEPS
// =============================================================================

/// Read a CSV file into a transformed record store.
pub fn load_records(path: &Path) -> Result<RecordStore, StabilisError> {
    let canonical = validate_file_path(path)?;
    validate_file_size(&canonical, MAX_INPUT_FILE_SIZE)?;

    let text = std::fs::read_to_string(&canonical).map_err(|e| {
        StabilisError::Io(format!("Cannot read '{}': {}", canonical.display(), e))
    })?;

    let mut store = RecordStore::from_csv(&text)?;
    store.transform()?;

    tracing::info!(
        path = %canonical.display(),
        records = store.len(),
        ground_truth = store.has_ground_truth(),
        "input loaded"
    );
    Ok(store)
}

/// Open the configured artifact backend.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn ArtifactStore>, StabilisError> {
    match config.backend {
        Backend::Dir => Ok(Arc::new(DirectoryArtifactStore::open(&config.models)?)),
        Backend::Redb => {
            let path = if config.models.is_dir() {
                config.models.join(REDB_FILE_NAME)
            } else {
                config.models.clone()
            };
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StabilisError::Io(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
            Ok(Arc::new(RedbArtifactStore::open(&path)?))
        }
    }
}

/// Run the standard roster on a blocking worker, cancelled by Ctrl+C.
///
/// The record store is handed back with the predictions.
pub async fn run_pipeline(
    config: &AppConfig,
    records: RecordStore,
    mode: RunMode,
) -> Result<(RecordStore, Vec<Prediction>), StabilisError> {
    let store = open_store(config)?;
    let roster = Roster::standard(&config.pipeline)?;
    let mut pipeline = EnsemblePipeline::new(roster, store, config.pipeline.clone());

    tracing::info!(
        ?mode,
        backend = config.backend.name(),
        models = %config.models.display(),
        members = pipeline.roster().len(),
        "ensemble run starting"
    );

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling after the current stage");
                cancel.cancel();
            }
        })
    };

    let joined = tokio::task::spawn_blocking(move || {
        let predictions = pipeline.run(&records, mode, &cancel)?;
        Ok::<_, StabilisError>((records, predictions))
    })
    .await;
    watcher.abort();

    let (records, predictions) =
        joined.map_err(|e| StabilisError::InvalidState(format!("ensemble worker: {}", e)))??;
    tracing::info!(predictions = predictions.len(), "ensemble run finished");
    Ok((records, predictions))
}

/// Score predictions against the ground truth carried by `records`.
pub fn evaluate(
    records: &RecordStore,
    predictions: &[Prediction],
) -> Result<EvaluationReport, StabilisError> {
    let labels: Vec<_> = predictions.iter().map(|p| p.label).collect();
    let ddg: Vec<f64> = predictions.iter().map(|p| p.ddg).collect();
    EvaluationReport::compute(
        &records.expected_classification()?,
        &labels,
        &records.expected_regression()?,
        &ddg,
    )
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Render predictions as CSV, one row per input record.
///
/// Fields containing commas or quotes are quoted.
pub fn format_predictions_csv(predictions: &[Prediction]) -> Result<String, StabilisError> {
    let csv_err = |e: csv::Error| StabilisError::Serialization(e.to_string());

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(PREDICTION_HEADER.split(','))
        .map_err(csv_err)?;
    for p in predictions {
        writer
            .write_record([
                p.protein.as_str(),
                p.chain.as_str(),
                p.mutation.as_str(),
                &p.label.as_u8().to_string(),
                &p.ddg.to_string(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| StabilisError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StabilisError::Serialization(e.to_string()))
}

fn format_predictions_json(predictions: &[Prediction]) -> Result<String, StabilisError> {
    serde_json::to_string_pretty(predictions)
        .map_err(|e| StabilisError::Serialization(e.to_string()))
}

/// Write to `output`, or stdout when absent.
fn emit(text: &str, output: Option<&Path>) -> Result<(), StabilisError> {
    match output {
        Some(path) => {
            let path = validate_output_path(path)?;
            std::fs::write(&path, text).map_err(|e| {
                StabilisError::Io(format!("Cannot write '{}': {}", path.display(), e))
            })?;
            tracing::info!(path = %path.display(), "predictions written");
            Ok(())
        }
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

fn print_report(report: &EvaluationReport) {
    let m = &report.confusion;
    println!("Confusion Matrix");
    println!("================");
    println!("True positives:  {}", m.true_positives);
    println!("False negatives: {}", m.false_negatives);
    println!("True negatives:  {}", m.true_negatives);
    println!("False positives: {}", m.false_positives);
    println!();
    println!("Sensitivity: {:.4}", report.sensitivity);
    println!("Specificity: {:.4}", report.specificity);
    println!("Precision:   {:.4}", report.precision);
    println!("F-score:     {:.4}", report.f_score);
    println!("Accuracy:    {:.4}", report.accuracy);
    println!("MCC:         {:.4}", report.matthews);
    println!("MSE (ddG):   {:.4}", report.mean_squared_error);
}

// =============================================================================
// TRAIN COMMAND
// =============================================================================

/// Fit and persist every member, then report training-set scores.
pub async fn cmd_train(
    config: &AppConfig,
    input: &Path,
    json_mode: bool,
    quiet: bool,
) -> Result<(), StabilisError> {
    let records = load_records(input)?;
    // Fail before any learner runs
    records.expected_regression()?;

    let members: Vec<String> = Roster::standard(&config.pipeline)?
        .members()
        .iter()
        .map(|m| m.id().to_string())
        .collect();

    let (records, predictions) = run_pipeline(config, records, RunMode::Train).await?;
    let report = evaluate(&records, &predictions)?;

    if json_mode {
        let output = serde_json::json!({
            "mode": "train",
            "records": records.len(),
            "backend": config.backend.name(),
            "models": config.models.to_string_lossy(),
            "members": members,
            "report": report,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    if !quiet {
        println!("Training complete");
        println!("=================");
        println!("Records: {}", records.len());
        println!("Backend: {}", config.backend.name());
        println!("Models:  {}", config.models.display());
        println!("Members: {}", members.join(", "));
        println!();
        print_report(&report);
    }
    Ok(())
}

// =============================================================================
// PREDICT COMMAND
// =============================================================================

/// Predict with persisted models.
pub async fn cmd_predict(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    json_mode: bool,
) -> Result<(), StabilisError> {
    let records = load_records(input)?;
    let (_, predictions) = run_pipeline(config, records, RunMode::Predict).await?;

    let text = if json_mode {
        format_predictions_json(&predictions)?
    } else {
        format_predictions_csv(&predictions)?
    };
    emit(&text, output)
}

// =============================================================================
// EVALUATE COMMAND
// =============================================================================

/// Predict a labelled input and print its scores.
pub async fn cmd_evaluate(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
    json_mode: bool,
) -> Result<(), StabilisError> {
    let records = load_records(input)?;
    records.expected_regression()?;

    let (records, predictions) = run_pipeline(config, records, RunMode::Evaluate).await?;
    let report = evaluate(&records, &predictions)?;

    if let Some(path) = output {
        emit(&format_predictions_csv(&predictions)?, Some(path))?;
    }

    if json_mode {
        let output = serde_json::json!({
            "mode": "evaluate",
            "records": records.len(),
            "report": report,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Print the effective configuration.
pub fn cmd_config(config: &AppConfig, json_mode: bool) -> Result<(), StabilisError> {
    if json_mode {
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| StabilisError::Serialization(e.to_string()))?;
        println!("{}", text);
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}
