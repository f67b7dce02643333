//! Testing utilities for the Isaac content workspace
//!
//! Call-counting collaborators and sample content trees.

#![allow(missing_docs)]

use async_trait::async_trait;
use isaac_model::{TreePath, VersionId};
use isaac_search::{IndexDocument, MemorySearchBackend, SearchBackend, SearchError, SearchHit};
use isaac_store::{MemoryVersionStore, StoreError, TreeEntry, TreeHandle, VersionStore};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn version(raw: &str) -> VersionId {
    VersionId::new(raw).unwrap()
}

/// Content JSON of a page with related ids
pub fn page_json(id: &str, related: &[&str]) -> String {
    let related: Vec<String> = related.iter().map(|r| format!("\"{r}\"")).collect();
    format!(
        r#"{{"id":"{id}","type":"page","title":"Page {id}","relatedContent":[{}]}}"#,
        related.join(",")
    )
}

/// Version "abc123": `page1.json` (p1 → p2) and `page2.json` (p2)
pub fn abc123_store() -> Arc<MemoryVersionStore> {
    let store = MemoryVersionStore::new();
    store
        .commit_as(
            version("abc123"),
            [
                ("page1.json", page_json("p1", &["p2"])),
                ("page2.json", page_json("p2", &[])),
            ],
        )
        .unwrap();
    Arc::new(store)
}

/// Version "abc123" with `page2.json` deleted
pub fn abc123_without_page2() -> Arc<MemoryVersionStore> {
    let store = MemoryVersionStore::new();
    store
        .commit_as(version("abc123"), [("page1.json", page_json("p1", &["p2"]))])
        .unwrap();
    Arc::new(store)
}

/// Version "fig1": `fig.json` points at a `diagram.png` that is not there
pub fn missing_figure_store() -> Arc<MemoryVersionStore> {
    let store = MemoryVersionStore::new();
    store
        .commit_as(
            version("fig1"),
            [("fig.json", r#"{"type":"figure","src":"diagram.png"}"#)],
        )
        .unwrap();
    Arc::new(store)
}

/// Version store spy counting resolves and walks
#[derive(Debug)]
pub struct CountingVersionStore {
    inner: Arc<dyn VersionStore>,
    resolves: AtomicUsize,
    walks: AtomicUsize,
    walk_delay: Option<Duration>,
}

impl CountingVersionStore {
    pub fn new(inner: Arc<dyn VersionStore>) -> Self {
        Self {
            inner,
            resolves: AtomicUsize::new(0),
            walks: AtomicUsize::new(0),
            walk_delay: None,
        }
    }

    /// Sleep before every walk, widening race windows
    #[must_use]
    pub fn with_walk_delay(mut self, delay: Duration) -> Self {
        self.walk_delay = Some(delay);
        self
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn walk_count(&self) -> usize {
        self.walks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VersionStore for CountingVersionStore {
    async fn resolve(&self, version: &VersionId) -> Result<Option<TreeHandle>, StoreError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(version).await
    }

    async fn walk(&self, tree: &TreeHandle, suffix: &str) -> Result<Vec<TreeEntry>, StoreError> {
        self.walks.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.walk_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.walk(tree, suffix).await
    }

    async fn path_exists(&self, version: &VersionId, path: &TreePath) -> Result<bool, StoreError> {
        self.inner.path_exists(version, path).await
    }

    async fn read_file(
        &self,
        version: &VersionId,
        path: &TreePath,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.read_file(version, path).await
    }

    async fn list_versions(&self) -> Result<Vec<VersionId>, StoreError> {
        self.inner.list_versions().await
    }
}

/// In-memory search backend counting index passes
#[derive(Debug, Default)]
pub struct CountingSearchBackend {
    inner: MemorySearchBackend,
    documents: AtomicUsize,
    ready_marks: AtomicUsize,
}

impl CountingSearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage or a recovery
    pub fn set_available(&self, available: bool) {
        self.inner.set_available(available);
    }

    /// Documents submitted
    pub fn document_count(&self) -> usize {
        self.documents.load(Ordering::SeqCst)
    }

    /// Completed index passes
    pub fn ready_count(&self) -> usize {
        self.ready_marks.load(Ordering::SeqCst)
    }

    /// Forget every index, as a restarted backend would
    pub async fn restart(&self) {
        self.inner.drop_all().await.unwrap();
    }
}

#[async_trait]
impl SearchBackend for CountingSearchBackend {
    async fn has_index(&self, version: &VersionId) -> Result<bool, SearchError> {
        self.inner.has_index(version).await
    }

    async fn index_document(
        &self,
        version: &VersionId,
        doc_type: &str,
        document: IndexDocument,
    ) -> Result<(), SearchError> {
        self.inner.index_document(version, doc_type, document).await?;
        self.documents.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mark_ready(&self, version: &VersionId) -> Result<(), SearchError> {
        self.inner.mark_ready(version).await?;
        self.ready_marks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fuzzy_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        query: &str,
        fields: &[String],
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.inner.fuzzy_search(version, doc_type, query, fields).await
    }

    async fn term_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        terms: &[String],
        field: &str,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.inner.term_search(version, doc_type, terms, field).await
    }

    async fn field_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        fields: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.inner.field_search(version, doc_type, fields).await
    }

    async fn drop_index(&self, version: &VersionId) -> Result<(), SearchError> {
        self.inner.drop_index(version).await
    }

    async fn drop_all(&self) -> Result<(), SearchError> {
        self.inner.drop_all().await
    }
}
