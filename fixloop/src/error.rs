//! Error types for the fixloop library
//!
//! Build failures are never errors here: they are ordinary loop input.
//! `FixError` covers the things that stop a run outright, such as a
//! snapshot that cannot be written or a manifest that does not exist.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for fixloop operations
pub type FixResult<T> = Result<T, FixError>;

/// Errors that can occur while mutating or inspecting a project
#[derive(Error, Debug)]
pub enum FixError {
    /// Filesystem operation failed on a specific path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was expected in the source tree but is absent
    #[error("File not found in project tree: {path}")]
    NotFound { path: PathBuf },

    /// The build manifest could not be located
    #[error("Build manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// A clean/build command string could not be turned into argv
    #[error("Invalid {role} command: {message}")]
    InvalidCommand { role: String, message: String },

    /// A per-symbol pattern failed to compile
    #[error("Pattern error for '{subject}': {source}")]
    Pattern {
        subject: String,
        #[source]
        source: regex::Error,
    },
}

impl FixError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a not-found error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a manifest-not-found error
    pub fn manifest_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ManifestNotFound { path: path.into() }
    }

    /// Create an invalid command error
    pub fn invalid_command(role: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            role: role.into(),
            message: message.into(),
        }
    }

    /// Create a pattern error for a subject-specific regex
    pub fn pattern(subject: impl Into<String>, source: regex::Error) -> Self {
        Self::Pattern {
            subject: subject.into(),
            source,
        }
    }

    /// Whether this error came from reading content that is not valid UTF-8.
    ///
    /// Source scans skip such files instead of aborting the round.
    pub fn is_undecodable(&self) -> bool {
        matches!(
            self,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::InvalidData
        )
    }
}
