//! Configuration loading for the chorale harmony service.
//!
//! # Usage
//!
//! ```rust,no_run
//! use choraleconf::ChoraleConfig;
//!
//! let config = ChoraleConfig::load().expect("Failed to load config");
//! println!("listening on {}", config.bind.address());
//! println!("MIDI copies go to {}", config.paths.output_dir.display());
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/chorale/config.toml` (system)
//! 2. `~/.config/chorale/config.toml` (user)
//! 3. `./chorale.toml`, or the path given on the command line
//! 4. Environment variables (`CHORALE_*`, `RUST_LOG`, `OTEL_EXPORTER_OTLP_ENDPOINT`)
//!
//! Files merge table by table, so a local file that only sets
//! `bind.http_port` keeps the host from the user file.
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! host = "127.0.0.1"
//! http_port = 8000
//!
//! [paths]
//! output_dir = "~/midi/chorale"
//!
//! [telemetry]
//! otlp_endpoint = "http://127.0.0.1:4317"
//! log_level = "info,chorale=debug"
//!
//! [harmony]
//! harmony_program = 48
//! harmony_velocity = 60
//! persist_artifacts = true
//!
//! [references.exercise_g_major_01]
//! name = "G Major Exercise 01"
//! description = "Five-note run from G"
//! [references.exercise_g_major_01.points]
//! 0 = 67
//! 1 = 69
//! 2 = 71
//! ```

pub mod infra;
pub mod loader;
pub mod music;

pub use infra::{BindConfig, PathsConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use music::{HarmonyConfig, ReferenceConfig};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Complete service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChoraleConfig {
    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub harmony: HarmonyConfig,

    /// Extra grading templates, keyed by reference id.
    #[serde(default)]
    pub references: BTreeMap<String, ReferenceConfig>,
}

impl ChoraleConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with `config_path` standing in for `./chorale.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    pub fn load_with_sources() -> Result<(Self, ConfigSources), ConfigError> {
        Self::load_with_sources_from(None)
    }

    /// Load configuration from an optional path and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut merged = toml::Table::new();

        for path in loader::discover_config_files_with_override(config_path) {
            let table = loader::read_table(&path)?;
            loader::merge_tables(&mut merged, table);
            sources.files.push(path);
        }

        let mut config = loader::from_table(merged).map_err(ConfigError::Invalid)?;
        let output_dir = config.paths.output_dir.to_string_lossy().into_owned();
        config.paths.output_dir = loader::expand_path(&output_dir);

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Check cross-field constraints after all sources are applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.harmony.validate().map_err(ConfigError::Invalid)?;
        for (id, reference) in &self.references {
            if id.is_empty() {
                return Err(ConfigError::Invalid("reference id must not be empty".into()));
            }
            reference
                .points()
                .map_err(|e| ConfigError::Invalid(format!("references.{}: {}", id, e)))?;
        }
        Ok(())
    }

    /// Serialize config to TOML, as printed by `--print-config`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let body = toml::to_string(self)?;
        Ok(format!("# Chorale Configuration\n\n{}", body))
    }
}
