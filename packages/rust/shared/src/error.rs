//! Error types for siteindex.
//!
//! Library crates use [`SiteIndexError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all siteindex operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteIndexError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP transport error while fetching artifacts.
    #[error("network error: {0}")]
    Network(String),

    /// Unreadable index blob, document list, or other serialized data.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (unsupported version, invalid path, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A runtime fetch found no artifact for the requested partition.
    #[error("{file} not found for index={index:?}")]
    MissingArtifact { index: String, file: String },

    /// The dev server was asked for an artifact that no build has produced.
    #[error(
        "could not find pre-built search artifact at {path:?}: search is not available \
         until the site has been built at least once"
    )]
    ArtifactNotBuilt { path: PathBuf },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteIndexError>;

impl SiteIndexError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Missing artifact `file` for the partition named `index`.
    pub fn missing_artifact(index: impl Into<String>, file: impl Into<String>) -> Self {
        Self::MissingArtifact {
            index: index.into(),
            file: file.into(),
        }
    }
}
