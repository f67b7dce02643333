//! Error types for content ingest
//!
//! - [`ParseError`]: one file could not become a content tree
//! - [`RegistryError`]: type registry misconfiguration
//! - [`BuildError`]: a whole version could not be built

use isaac_model::VersionId;
use isaac_store::StoreError;
use std::sync::Arc;

/// Errors while decoding a single document
///
/// Always recoverable: the builder skips the file and records the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Malformed JSON
    #[error("syntax error in {path}: {message}")]
    Syntax { path: String, message: String },

    /// Type tag with no registered decoder (strict mode only)
    #[error("unknown content type '{kind}' in {path}")]
    UnknownType { path: String, kind: String },

    /// Node without a `type` field
    #[error("missing type field in {path}")]
    MissingType { path: String },

    /// Field with the wrong shape
    #[error("invalid field '{field}' in {path}: {message}")]
    InvalidField {
        path: String,
        field: String,
        message: String,
    },
}

impl ParseError {
    /// Create syntax error for path
    pub fn syntax(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Syntax {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create invalid field error
    pub fn invalid_field(
        path: impl Into<String>,
        field: impl Into<String>,
        message: impl ToString,
    ) -> Self {
        Self::InvalidField {
            path: path.into(),
            field: field.into(),
            message: message.to_string(),
        }
    }

    /// File the error refers to
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Syntax { path, .. }
            | Self::UnknownType { path, .. }
            | Self::MissingType { path }
            | Self::InvalidField { path, .. } => path,
        }
    }
}

/// Errors while configuring a [`TypeRegistry`](crate::TypeRegistry)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Type tag registered twice
    #[error("content type '{0}' is already registered")]
    DuplicateType(String),

    /// Blank type tag
    #[error("content type tag must not be empty")]
    EmptyType,
}

/// Errors that abort a version build
///
/// Cloneable so a single failed build can be reported to every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    /// Version store failure during resolve or walk
    #[error("version store error: {0}")]
    Store(#[source] Arc<StoreError>),

    /// The store does not know the version
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),
}

impl From<StoreError> for BuildError {
    fn from(err: StoreError) -> Self {
        Self::Store(Arc::new(err))
    }
}
