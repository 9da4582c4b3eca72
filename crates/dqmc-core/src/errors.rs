//! Error families raised by the DQMC crates.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable description of a failure.
///
/// `code` is stable and meant for matching (`wrap-limit`, `field-shape`, ...); `context`
/// carries the offending values, and `hint` tells the operator what to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code.
    pub code: String,
    /// Diagnostic message.
    pub message: String,
    /// Offending values keyed by parameter name, slice index or path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
    /// Suggested remedy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with `code` and `message` and nothing else.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `key = value`, replacing an earlier value for the same key.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a remedy shown after the message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let mut entries = self.context.iter();
        if let Some((key, value)) = entries.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in entries {
                write!(f, ", {key}={value}")?;
            }
            write!(f, ")")?;
        }
        match &self.hint {
            Some(hint) => write!(f, "; hint: {hint}"),
            None => Ok(()),
        }
    }
}

/// Error type returned by every fallible DQMC operation.
///
/// `Config` errors surface before any sweep runs. A `Stabilization` error means the
/// Green's function can no longer be trusted, so the run that raised it must stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum DqmcError {
    /// Malformed or inconsistent parameters and input files.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Factorization failure or repeated wrap-error breach.
    #[error("stabilization error: {0}")]
    Stabilization(ErrorInfo),
    /// Open, read or write failure on an external file.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// JSON or YAML encoding failure.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl DqmcError {
    /// Payload of any family.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            DqmcError::Config(info)
            | DqmcError::Stabilization(info)
            | DqmcError::Io(info)
            | DqmcError::Serde(info) => info,
        }
    }

    /// `Io` error for a failed operation on `path`.
    pub fn io(code: impl Into<String>, err: &std::io::Error, path: &Path) -> Self {
        DqmcError::Io(
            ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
        )
    }

    /// Returns `true` when statistics gathered by the failing run are invalid.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(self, DqmcError::Stabilization(_))
    }
}
