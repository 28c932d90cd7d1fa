//! Error types for workbench-core.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Caller-facing classification of a rejected operation.
///
/// The controller layer maps each kind to a stable response code, see
/// [`ErrorKind::status_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required field is missing, null, empty or malformed.
    InvalidParameters,
    /// The referenced link or project does not exist.
    NotFound,
    /// The operation would create a duplicate.
    Exists,
}

impl ErrorKind {
    /// Wire code, e.g. `INVALID_PARAMETERS`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameters => "INVALID_PARAMETERS",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Exists => "EXISTS",
        }
    }

    /// HTTP status a controller should answer with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidParameters => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Exists => 409,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected link or status operation. Never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParameters, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Exists, message)
    }
}

/// All errors that can arise from project-metadata registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse project metadata at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The project id is not usable as a metadata file name.
    #[error("invalid project id: {0}")]
    InvalidProjectId(#[from] ValidationError),

    /// The project metadata file did not exist at the expected path.
    #[error("project metadata not found at {path}")]
    RegistryNotFound { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_wire_codes_and_statuses() {
        assert_eq!(ErrorKind::InvalidParameters.as_str(), "INVALID_PARAMETERS");
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Exists.status_code(), 409);
        assert_eq!(ErrorKind::InvalidParameters.status_code(), 400);
    }

    #[test]
    fn validation_error_display_leads_with_code() {
        let err = ValidationError::exists("envName 'API' already exists");
        assert_eq!(err.to_string(), "EXISTS: envName 'API' already exists");
    }
}
