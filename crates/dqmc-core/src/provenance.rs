//! Schema versions and run provenance stamped onto every written artefact.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{DqmcError, ErrorInfo};

/// `major.minor.patch` version of a JSON artefact layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when existing fields change meaning or disappear.
    pub major: u32,
    /// Bumped when fields are added.
    pub minor: u32,
    /// Bumped for fixes that leave the layout untouched.
    pub patch: u32,
}

impl SchemaVersion {
    /// Layout written by this build.
    pub const CURRENT: SchemaVersion = SchemaVersion::new(1, 0, 0);

    /// Version `major.minor.patch`.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Artefacts with the same major version can be read by this build.
    pub fn is_readable(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Where a set of results came from: input hash, seed, time and tool versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// [`stable_hash`] of the run configuration.
    pub input_hash: String,
    /// Seed of the chain.
    pub seed: u64,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Crate name to version.
    pub tool_versions: BTreeMap<String, String>,
}

impl RunProvenance {
    /// Builds provenance for a run over `input`, stamped with the current time.
    pub fn capture<T: Serialize>(input: &T, seed: u64) -> Result<Self, DqmcError> {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Ok(Self {
            input_hash: stable_hash(input)?,
            seed,
            created_at: chrono::Utc::now().to_rfc3339(),
            tool_versions,
        })
    }
}

/// Hex-encoded SHA-256 of the JSON form of `value`.
pub fn stable_hash<T: Serialize>(value: &T) -> Result<String, DqmcError> {
    let bytes = serde_json::to_vec(value)
        .map_err(|err| DqmcError::Serde(ErrorInfo::new("json-serialize", err.to_string())))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}
