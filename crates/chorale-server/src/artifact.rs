//! Where generated MIDI files go after they are sent to the client.
//!
//! Persisting is a side effect: a sink that fails is logged by the caller
//! and never turns a successful harmonization into an error.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

/// Trait for artifact storage backends.
pub trait ArtifactSink: Send + Sync {
    /// Store `data` under a name derived from `name`.
    ///
    /// Returns the path written, or `None` when the sink keeps nothing.
    fn persist(&self, name: &str, data: &[u8]) -> Result<Option<PathBuf>>;
}

/// Writes `{output_dir}/{YYYYmmdd_HHMMSS}_{name}`.
#[derive(Debug, Clone)]
pub struct FileSink {
    output_dir: PathBuf,
}

impl FileSink {
    /// The directory is created on first write, not here.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn path_for(&self, name: &str, at: DateTime<Local>) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}", at.format("%Y%m%d_%H%M%S"), name))
    }
}

impl ArtifactSink for FileSink {
    fn persist(&self, name: &str, data: &[u8]) -> Result<Option<PathBuf>> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                self.output_dir.display()
            )
        })?;

        let path = self.path_for(name, Local::now());
        fs::write(&path, data)
            .with_context(|| format!("failed to write artifact {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = data.len(), "persisted artifact");
        Ok(Some(path))
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ArtifactSink for NullSink {
    fn persist(&self, _name: &str, _data: &[u8]) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}
