//! Version store errors

use isaac_model::{ContentHash, PathError, VersionId};
use std::path::PathBuf;

/// Errors raised by a [`VersionStore`](crate::VersionStore)
///
/// Unknown versions and missing files are not errors; lookups report them
/// as `None` / `false`. Everything here means the store itself misbehaved.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file name that cannot be expressed as a tree path
    #[error("invalid tree path: {0}")]
    InvalidPath(#[from] PathError),

    /// Handle refers to a version that has since been removed
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// A version id is already committed with a different tree
    #[error("version {0} already exists with different content")]
    VersionExists(VersionId),

    /// Snapshot references a blob the store does not hold
    #[error("blob {0} missing from store")]
    MissingBlob(ContentHash),

    /// Blocking filesystem task panicked or was cancelled
    #[error("blocking task failed: {0}")]
    Blocking(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Blocking(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_mentions_path() {
        let err = StoreError::io_error(
            "/content/v1",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "io error at /content/v1: gone");
    }

    #[test]
    fn path_errors_convert() {
        let err: StoreError = isaac_model::TreePath::parse("../x").unwrap_err().into();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }
}
