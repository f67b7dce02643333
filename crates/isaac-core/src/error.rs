//! Error types for the content manager
//!
//! Expected conditions (an unknown version, a missing id, a search backend
//! outage) surface as `None`, empty results or [`VersionState::CacheOnly`].
//! [`ContentError`] is kept for failures a caller may want to retry.
//!
//! [`VersionState::CacheOnly`]: crate::VersionState::CacheOnly

use isaac_ingest::{BuildError, ParseError, RegistryError};
use isaac_model::{PathError, VersionId};
use isaac_search::SearchError;
use isaac_store::StoreError;
use std::sync::Arc;

/// Main content manager error type
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The version store cannot resolve the version
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// The version store holds no versions at all
    #[error("no content versions available")]
    NoVersions,

    /// Version store failure
    #[error("version store error: {0}")]
    Store(#[source] Arc<StoreError>),

    /// Search backend failure
    #[error("search backend error: {0}")]
    Search(#[from] SearchError),

    /// A search hit could not be decoded back into content
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Content type registration failed
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Malformed path inside a version tree
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// `ensure_cache` exceeded its deadline
    #[error("ensure cache timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Background task panicked or was cancelled
    #[error("content task failed: {0}")]
    Task(String),
}

impl ContentError {
    /// Check if a later attempt may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(_) | Self::Timeout { .. } | Self::Task(_) => true,
            Self::Search(err) => err.is_transient(),
            _ => false,
        }
    }

    /// Check if the error means "no such version"
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::VersionNotFound(_) | Self::NoVersions)
    }
}

impl From<StoreError> for ContentError {
    fn from(err: StoreError) -> Self {
        Self::Store(Arc::new(err))
    }
}

impl From<Arc<BuildError>> for ContentError {
    fn from(err: Arc<BuildError>) -> Self {
        match err.as_ref() {
            BuildError::VersionNotFound(version) => Self::VersionNotFound(version.clone()),
            BuildError::Store(store) => Self::Store(Arc::clone(store)),
        }
    }
}

impl From<tokio::task::JoinError> for ContentError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
