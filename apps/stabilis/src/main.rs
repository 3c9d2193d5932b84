//! # Stabilis
//!
//! Command line front end for stabilis-core.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │              apps/stabilis (THE BINARY)          │
//! │                                                  │
//! │  ┌───────────┐   ┌───────────┐   ┌────────────┐  │
//! │  │   CLI     │   │  Config   │   │  Ctrl+C    │  │
//! │  │  (clap)   │   │  (toml)   │   │  (tokio)   │  │
//! │  └─────┬─────┘   └─────┬─────┘   └─────┬──────┘  │
//! │        └───────────────┼───────────────┘         │
//! │                        ▼                         │
//! │               ┌────────────────┐                 │
//! │               │ stabilis-core  │                 │
//! │               │  (THE LOGIC)   │                 │
//! │               └────────────────┘                 │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! stabilis train -i training.csv
//! stabilis predict -i mutations.csv -o predictions.csv
//! stabilis evaluate -i benchmark.csv --json-mode
//! stabilis --backend redb --models models.redb predict -i mutations.csv
//! ```

use clap::Parser;
use stabilis::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // STABILIS_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STABILIS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "stabilis=debug,stabilis_core=debug"
    } else {
        "stabilis=info,stabilis_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("STABILIS_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr; stdout carries predictions and reports
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
