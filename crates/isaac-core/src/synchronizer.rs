//! Search index synchronisation
//!
//! Pushes every node of a built [`VersionCache`] to the search backend and
//! then marks the version ready. Readiness is checked before taking the
//! per-version lock and again after acquiring it, so a second caller (in
//! this process or another one sharing the backend) that finds the index
//! finished gives up without re-indexing.

use dashmap::DashMap;
use isaac_ingest::{ContentMapper, VersionCache};
use isaac_model::{ContentNode, VersionId};
use isaac_search::{IndexDocument, SearchBackend, SearchError};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Document type all content nodes are indexed under
pub const CONTENT_DOC_TYPE: &str = "content";

/// Result of [`SearchSynchronizer::index_version`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    /// The backend already had a ready index
    AlreadyIndexed,
    /// This call built the index
    Indexed { documents: usize, failures: usize },
}

/// Indexes cached versions into a [`SearchBackend`]
#[derive(Debug)]
pub struct SearchSynchronizer {
    backend: Arc<dyn SearchBackend>,
    mapper: ContentMapper,
    locks: DashMap<VersionId, Arc<Mutex<()>>>,
}

impl SearchSynchronizer {
    /// Create new synchronizer
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>, mapper: ContentMapper) -> Self {
        Self {
            backend,
            mapper,
            locks: DashMap::new(),
        }
    }

    /// Backend in use
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    /// Build the search index for a cached version unless it is ready
    ///
    /// Documents the backend rejects are logged and skipped. An outage
    /// aborts the run; the version stays unready and the next call starts
    /// over.
    ///
    /// # Errors
    /// Returns the transient [`SearchError`] that aborted indexing.
    pub async fn index_version(&self, cache: &VersionCache) -> Result<IndexOutcome, SearchError> {
        let version = cache.version();
        if self.backend.has_index(version).await? {
            return Ok(IndexOutcome::AlreadyIndexed);
        }

        let lock = self.lock_for(version);
        let _guard = lock.lock().await;
        if self.backend.has_index(version).await? {
            tracing::info!(
                "Search index for {} was built by another task; nothing to do",
                version.short()
            );
            return Ok(IndexOutcome::AlreadyIndexed);
        }

        tracing::info!(
            "Building search index for {} ({} nodes)",
            version.short(),
            cache.len()
        );
        let mut documents = 0;
        let mut failures = 0;
        for node in cache.nodes() {
            let document = match self.document_for(node) {
                Ok(document) => document,
                Err(err) => {
                    tracing::warn!("Unable to serialize {:?} for indexing: {}", node.id(), err);
                    failures += 1;
                    continue;
                }
            };
            match self
                .backend
                .index_document(version, CONTENT_DOC_TYPE, document)
                .await
            {
                Ok(()) => documents += 1,
                Err(err) if err.is_transient() => {
                    tracing::error!(
                        "Search backend failed while indexing {}: {}",
                        version.short(),
                        err
                    );
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!("Search backend rejected {:?}: {}", node.id(), err);
                    failures += 1;
                }
            }
        }

        self.backend.mark_ready(version).await?;
        tracing::info!(
            "Search index for {} complete: {} documents, {} failures",
            version.short(),
            documents,
            failures
        );
        Ok(IndexOutcome::Indexed {
            documents,
            failures,
        })
    }

    /// Search document for one node
    ///
    /// The stored source is the full polymorphic JSON, so hits decode back
    /// into the same node.
    ///
    /// # Errors
    /// Returns the serialization error.
    pub fn document_for(&self, node: &ContentNode) -> Result<IndexDocument, serde_json::Error> {
        let source = self.mapper.encode_string(node)?;
        let id = node.id().unwrap_or_default();
        let tags: Vec<&str> = node.tags.iter().map(String::as_str).collect();

        let mut document = IndexDocument::new(id, source)
            .with_text("id", id)
            .with_text("title", node.title.clone().unwrap_or_default())
            .with_text("tags", tags.join(" "))
            .with_text("value", node.value.clone().unwrap_or_default())
            .with_text("children", node.descendant_text())
            .with_terms("id", [id])
            .with_terms("type", [node.kind.as_str()])
            .with_terms("tags", tags);
        for (field, term) in [
            ("title", node.title.as_deref()),
            ("layout", node.layout.as_deref()),
            ("author", node.author.as_deref()),
        ] {
            if let Some(term) = term {
                document = document.with_terms(field, [term]);
            }
        }
        if let Some(published) = node.published {
            document = document.with_terms("published", [published.to_string()]);
        }
        Ok(document)
    }

    /// Drop the lock of one version unless an index pass holds it
    ///
    /// A held lock stays registered so a later pass for the same version
    /// still queues behind the running one.
    pub fn forget(&self, version: &VersionId) {
        self.locks
            .remove_if(version, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Drop every lock no index pass holds
    pub fn forget_all(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    fn lock_for(&self, version: &VersionId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(version.clone()).or_default().value())
    }
}
