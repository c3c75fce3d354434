// src/errors.rs

//! Crate-wide error types and aliases.
//!
//! - [`ScriptrunError`] is what configuration loading and the CLI surface
//!   return.
//! - [`ResolutionError`] and [`StoreError`] are produced inside the lifecycle
//!   manager and contained there (logged, never propagated to the host).
//! - [`ArtifactError`] is returned directly to callers of
//!   [`crate::artifact::ArtifactAccess`].

use std::path::PathBuf;

use thiserror::Error;

use crate::store::{ProcessId, ProcessStatus};

/// Boxed cause carried by errors whose origin is an `anyhow` chain.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum ScriptrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The invoking identity could not be determined from the parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("No parameters given to resolve the invoker from")]
    NoParameters,

    #[error("No email found in parameters")]
    MissingEmail,

    #[error("No identity found with email: {0}")]
    UnknownEmail(String),
}

/// Failure of the process store or of one of its transactional scopes.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("process {0} not found")]
    NotFound(ProcessId),

    #[error("process {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: ProcessId,
        from: ProcessStatus,
        to: ProcessStatus,
    },

    #[error("process {id} was modified concurrently (expected {expected}, found {found})")]
    Conflict {
        id: ProcessId,
        expected: ProcessStatus,
        found: ProcessStatus,
    },

    #[error("process store unavailable: {0}")]
    Unavailable(#[source] BoxedCause),

    #[error("process store is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether retrying the same operation later could plausibly succeed.
    ///
    /// Unavailable media and lost optimistic races are transient; missing
    /// records, illegal transitions and unreadable data are structural.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Conflict { .. })
    }

    /// Short label used when logging a storage failure.
    pub fn kind(&self) -> &'static str {
        if self.is_transient() {
            "transient storage failure"
        } else {
            "structural storage failure"
        }
    }

    pub(crate) fn unavailable(err: anyhow::Error) -> Self {
        StoreError::Unavailable(err.into())
    }
}

/// I/O failure while reading or writing a named artifact.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("invalid artifact name: {0:?}")]
    InvalidName(String),

    #[error("artifact I/O failed for {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: BoxedCause,
    },
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source: err.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScriptrunError>;
