use std::path::PathBuf;

use thiserror::Error;

use workbench_core::{ErrorKind, RegistryError, ValidationError};
use workbench_links::LinkError;

/// Error surface for the workspace, status machine and daemon runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("link error: {0}")]
    Link(#[from] LinkError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl DaemonError {
    /// Caller-facing kind, if this is a rejected request rather than an
    /// I/O or runtime failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DaemonError::Validation(err) => Some(err.kind),
            DaemonError::Link(err) => err.kind(),
            DaemonError::Registry(RegistryError::InvalidProjectId(err)) => Some(err.kind),
            _ => None,
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
