use std::fs;
use std::path::{Path, PathBuf};

use dqmc_core::errors::{DqmcError, ErrorInfo};
use dqmc_core::{RunProvenance, SchemaVersion};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;

/// Structured manifest describing a completed or cancelled run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema of this manifest.
    pub schema: SchemaVersion,
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Seed of the chain.
    pub seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Configuration hash, timestamp and tool versions.
    pub provenance: RunProvenance,
    /// Files produced during the run, relative to the run directory.
    pub outputs: Vec<PathBuf>,
    /// Bins committed before the run ended.
    pub bins_completed: usize,
    /// Whether the run stopped early on request.
    pub cancelled: bool,
}

impl RunManifest {
    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), DqmcError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| DqmcError::io("manifest-write", &err, parent))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            DqmcError::Serde(
                ErrorInfo::new("json-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| DqmcError::io("manifest-write", &err, path))
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, DqmcError> {
        let contents =
            fs::read_to_string(path).map_err(|err| DqmcError::io("manifest-read", &err, path))?;
        let manifest: RunManifest = serde_json::from_str(&contents).map_err(|err| {
            DqmcError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        if !manifest.schema.is_readable() {
            return Err(DqmcError::Serde(
                ErrorInfo::new("manifest-schema", "manifest was written by an incompatible layout")
                    .with_context("path", path.display().to_string())
                    .with_context("found", manifest.schema.to_string())
                    .with_context("expected", SchemaVersion::CURRENT.to_string()),
            ));
        }
        Ok(manifest)
    }
}
