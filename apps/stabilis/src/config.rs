//! # Application Configuration
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (`--models`, `--backend`)
//! 2. TOML file given with `--config`
//! 3. Compiled defaults
//!
//! ```toml
//! models = "models"
//! backend = "redb"
//!
//! [pipeline]
//! window_size = 10
//! parallel = true
//!
//! [pipeline.network]
//! max_epochs = 5000
//! ```

use serde::{Deserialize, Serialize};
use stabilis_core::{PipelineConfig, StabilisError};
use std::path::{Path, PathBuf};

/// Default model location.
pub const DEFAULT_MODELS_PATH: &str = "models";

/// Maximum size of a configuration file (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Where trained models are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One `<id>.model` file per predictor in a directory.
    #[default]
    Dir,
    /// A single redb database file.
    Redb,
}

impl Backend {
    pub fn parse(name: &str) -> Result<Self, StabilisError> {
        match name {
            "dir" => Ok(Self::Dir),
            "redb" => Ok(Self::Redb),
            other => Err(StabilisError::InvalidState(format!(
                "unknown backend '{}' (expected 'dir' or 'redb')",
                other
            ))),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Dir => "dir",
            Self::Redb => "redb",
        }
    }
}

/// Effective configuration of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub models: PathBuf,
    pub backend: Backend,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: PathBuf::from(DEFAULT_MODELS_PATH),
            backend: Backend::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// CLI values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub models: Option<PathBuf>,
    pub backend: Option<String>,
}

impl AppConfig {
    /// Resolve the configuration from an optional file plus CLI overrides.
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self, StabilisError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(models) = &overrides.models {
            config.models = models.clone();
        }
        if let Some(backend) = &overrides.backend {
            config.backend = Backend::parse(backend)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, StabilisError> {
        toml::from_str(text).map_err(|e| StabilisError::Serialization(format!("config: {}", e)))
    }

    fn from_file(path: &Path) -> Result<Self, StabilisError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            StabilisError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(StabilisError::Serialization(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            StabilisError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "configuration file loaded");
        Self::from_toml(&text)
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<(), StabilisError> {
        let pipeline = &self.pipeline;
        if pipeline.window_size == 0 {
            return Err(StabilisError::InvalidState(
                "pipeline.window_size must be at least 1".to_string(),
            ));
        }
        if pipeline.forest.trees == 0 {
            return Err(StabilisError::InvalidState(
                "pipeline.forest.trees must be at least 1".to_string(),
            ));
        }
        if pipeline.svm.weight_ratio <= 0.0 {
            return Err(StabilisError::InvalidState(
                "pipeline.svm.weight_ratio must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML, for `stabilis config`.
    pub fn to_toml(&self) -> Result<String, StabilisError> {
        toml::to_string(self).map_err(|e| StabilisError::Serialization(e.to_string()))
    }
}
