//! Error taxonomy for composition, catalog registration, and export.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a composition request. All variants are local and
/// recoverable by adjusting the input or the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    /// No roles were selected.
    #[error("selection is empty: choose at least one role")]
    EmptySelection,

    /// The selection names a role neither catalog table knows.
    #[error("unknown role id '{0}'")]
    UnknownRoleId(String),

    /// Two distinct roles resolved to the same artifact name.
    #[error("roles '{first}' and '{second}' both resolve to artifact '{name}'")]
    DuplicateArtifactName {
        /// Colliding artifact name
        name: String,
        /// Role that claimed the name first
        first: String,
        /// Role that collided
        second: String,
    },

    /// Environment string outside {staging, production}.
    #[error("invalid environment '{0}' (expected 'staging' or 'production')")]
    InvalidEnvironment(String),
}

/// How a caller should present a composition failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The user asked for something malformed.
    InputValidation,
    /// The catalog cannot satisfy a well-formed request.
    CatalogConfiguration,
}

impl CompositionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptySelection | Self::InvalidEnvironment(_) => ErrorKind::InputValidation,
            Self::UnknownRoleId(_) | Self::DuplicateArtifactName { .. } => {
                ErrorKind::CatalogConfiguration
            }
        }
    }
}

/// Rejected catalog registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("invalid role name '{0}': must match ^[a-z][a-z0-9_]*$")]
    InvalidRoleName(String),

    #[error("role id '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Failure writing a project to disk or to an archive.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error for {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("manifest error: {0}")]
    Manifest(String),
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CompositionError::EmptySelection.kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            CompositionError::InvalidEnvironment("qa".into()).kind(),
            ErrorKind::InputValidation
        );
        assert_eq!(
            CompositionError::UnknownRoleId("x".into()).kind(),
            ErrorKind::CatalogConfiguration
        );
        let dup = CompositionError::DuplicateArtifactName {
            name: "webserver".into(),
            first: "web".into(),
            second: "nginx_alt".into(),
        };
        assert_eq!(dup.kind(), ErrorKind::CatalogConfiguration);
    }

    #[test]
    fn test_error_messages() {
        let dup = CompositionError::DuplicateArtifactName {
            name: "webserver".into(),
            first: "web".into(),
            second: "nginx_alt".into(),
        };
        let msg = dup.to_string();
        assert!(msg.contains("'web'"));
        assert!(msg.contains("'nginx_alt'"));
        assert!(msg.contains("'webserver'"));
        assert!(CompositionError::UnknownRoleId("ghost".into())
            .to_string()
            .contains("ghost"));
    }

    #[test]
    fn test_export_error_io_display() {
        let err = ExportError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/x"));
        assert!(err.to_string().contains("denied"));
    }
}
