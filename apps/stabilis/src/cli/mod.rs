//! # Stabilis CLI Module
//!
//! ## Available Commands
//!
//! - `train` - Fit every roster member on a labelled CSV and persist the models
//! - `predict` - Load persisted models and predict an unlabelled CSV
//! - `evaluate` - Predict a labelled CSV and score the result
//! - `config` - Print the effective configuration

mod commands;

use crate::config::{AppConfig, CliOverrides};
use clap::{Parser, Subcommand};
use stabilis_core::StabilisError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stabilis - protein mutation stability predictor
///
/// Classifies each point mutation as stabilizing or destabilizing and
/// estimates its ΔΔG with a fixed ensemble of learners.
#[derive(Parser, Debug)]
#[command(name = "stabilis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (overridden by STABILIS_LOG / RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress the human-readable run summary
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Model location: a directory for "dir", a database file for "redb"
    #[arg(short = 'M', long, global = true)]
    pub models: Option<PathBuf>,

    /// Model backend: "dir" (one file per predictor) or "redb" (single database)
    #[arg(short = 'B', long, global = true, value_parser = ["dir", "redb"])]
    pub backend: Option<String>,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train every predictor on a labelled CSV (requires `realddg`)
    Train {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Predict stability changes for a CSV with persisted models
    Predict {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Write predictions here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Predict a labelled CSV and report classification and regression scores
    Evaluate {
        /// Input CSV file (requires `realddg`)
        #[arg(short, long)]
        input: PathBuf,

        /// Also write the predictions here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

impl Cli {
    /// CLI flags that override the configuration file.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            models: self.models.clone(),
            backend: self.backend.clone(),
        }
    }
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Execute the parsed command.
pub async fn execute(cli: Cli) -> Result<(), StabilisError> {
    let config = AppConfig::load(cli.config.as_deref(), &cli.overrides())?;
    let json_mode = cli.json_mode;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Train { input } => cmd_train(&config, &input, json_mode, quiet).await,
        Commands::Predict { input, output } => {
            cmd_predict(&config, &input, output.as_deref(), json_mode).await
        }
        Commands::Evaluate { input, output } => {
            cmd_evaluate(&config, &input, output.as_deref(), json_mode).await
        }
        Commands::Config => cmd_config(&config, json_mode),
    }
}
