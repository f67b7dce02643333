//! The search backend contract

use crate::document::{IndexDocument, SearchHit};
use crate::error::SearchError;
use async_trait::async_trait;
use isaac_model::VersionId;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Per-version full-text and term index
///
/// An index for a version exists once documents are submitted but only
/// counts as ready after [`SearchBackend::mark_ready`]. Several processes
/// may share one backend, so readiness can flip to true underneath a caller.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait SearchBackend: Send + Sync + Debug {
    /// Whether a complete index exists for `version`
    async fn has_index(&self, version: &VersionId) -> Result<bool, SearchError>;

    /// Add or replace one document
    async fn index_document(
        &self,
        version: &VersionId,
        doc_type: &str,
        document: IndexDocument,
    ) -> Result<(), SearchError>;

    /// Flag the version's index as complete
    async fn mark_ready(&self, version: &VersionId) -> Result<(), SearchError>;

    /// Fuzzy full-text match of `query` against `fields`, best first
    async fn fuzzy_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        query: &str,
        fields: &[String],
    ) -> Result<Vec<SearchHit>, SearchError>;

    /// Documents whose term `field` holds any of `terms`
    async fn term_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        terms: &[String],
        field: &str,
    ) -> Result<Vec<SearchHit>, SearchError>;

    /// Documents matching every field, each field matching any of its values
    async fn field_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        fields: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<SearchHit>, SearchError>;

    /// Drop one version's index
    async fn drop_index(&self, version: &VersionId) -> Result<(), SearchError>;

    /// Drop every index
    async fn drop_all(&self) -> Result<(), SearchError>;
}

#[async_trait]
impl<T: SearchBackend + ?Sized> SearchBackend for Arc<T> {
    async fn has_index(&self, version: &VersionId) -> Result<bool, SearchError> {
        (**self).has_index(version).await
    }

    async fn index_document(
        &self,
        version: &VersionId,
        doc_type: &str,
        document: IndexDocument,
    ) -> Result<(), SearchError> {
        (**self).index_document(version, doc_type, document).await
    }

    async fn mark_ready(&self, version: &VersionId) -> Result<(), SearchError> {
        (**self).mark_ready(version).await
    }

    async fn fuzzy_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        query: &str,
        fields: &[String],
    ) -> Result<Vec<SearchHit>, SearchError> {
        (**self).fuzzy_search(version, doc_type, query, fields).await
    }

    async fn term_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        terms: &[String],
        field: &str,
    ) -> Result<Vec<SearchHit>, SearchError> {
        (**self).term_search(version, doc_type, terms, field).await
    }

    async fn field_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        fields: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        (**self).field_search(version, doc_type, fields).await
    }

    async fn drop_index(&self, version: &VersionId) -> Result<(), SearchError> {
        (**self).drop_index(version).await
    }

    async fn drop_all(&self) -> Result<(), SearchError> {
        (**self).drop_all().await
    }
}
