//! Search backend errors

use isaac_model::VersionId;

/// Errors raised by a [`SearchBackend`](crate::SearchBackend)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// Backend cannot be reached
    #[error("search backend unavailable: {0}")]
    Unavailable(String),

    /// No index exists for the version
    #[error("no search index for version {0}")]
    MissingIndex(VersionId),

    /// Backend refused a document
    #[error("document {id} rejected: {reason}")]
    Rejected { id: String, reason: String },

    /// Malformed query
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    /// Create rejection error
    pub fn rejected(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying later could succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(SearchError::Unavailable("connection refused".into()).is_transient());
        assert!(!SearchError::rejected("p1", "too large").is_transient());
        assert_eq!(
            SearchError::rejected("p1", "too large").to_string(),
            "document p1 rejected: too large"
        );
    }
}
