//! Error types for workbench-links.

use std::path::PathBuf;

use thiserror::Error;

use workbench_core::{ErrorKind, ValidationError};

/// All errors that can arise from link store operations.
///
/// Validation failures leave the link set untouched. An [`LinkError::Io`]
/// is only raised after the in-memory mutation has been committed; the
/// caller may retry the write with
/// [`LinkStore::rewrite_env_file`](crate::LinkStore::rewrite_env_file).
#[derive(Debug, Error)]
pub enum LinkError {
    /// The request was rejected (`INVALID_PARAMETERS`, `NOT_FOUND`, `EXISTS`).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Writing the environment file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LinkError {
    /// Validation kind, or `None` for an I/O failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            LinkError::Validation(err) => Some(err.kind),
            LinkError::Io { .. } => None,
        }
    }
}

/// Convenience constructor for [`LinkError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> LinkError {
    LinkError::Io {
        path: path.into(),
        source,
    }
}
