//! Content manager
//!
//! The [`ContentManager`] is the single gate every read passes through.
//! Each version moves through three states:
//!
//! ```text
//! ABSENT ──build──▶ CACHE_ONLY ──index──▶ READY
//!                        ▲                  │
//!                        └──index missing───┘
//! ```
//!
//! Builds are single-flight per version (see
//! [`VersionCacheStore`](isaac_ingest::VersionCacheStore)); the caller that
//! ran the build also validates it. Readiness is re-checked against the
//! search backend on every call, so a backend that lost its index is
//! re-populated from the cache without walking the tree again.

use crate::config::ContentConfig;
use crate::error::ContentError;
use crate::synchronizer::{IndexOutcome, SearchSynchronizer, CONTENT_DOC_TYPE};
use crate::types::{ProblemMap, ResultsWrapper, VersionState};
use crate::validator::{IntegrityReport, IntegrityValidator};
use dashmap::DashMap;
use isaac_ingest::{ContentMapper, TypeRegistry, VersionCache, VersionCacheBuilder, VersionCacheStore};
use isaac_model::{ContentNode, TreePath, VersionId, VersionSelector};
use isaac_search::{SearchBackend, SearchError, SearchHit};
use isaac_store::VersionStore;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

#[derive(Debug)]
struct ManagerInner {
    config: ContentConfig,
    store: Arc<dyn VersionStore>,
    mapper: ContentMapper,
    builder: VersionCacheBuilder,
    caches: VersionCacheStore,
    validator: IntegrityValidator,
    synchronizer: SearchSynchronizer,
    reports: DashMap<VersionId, Arc<IntegrityReport>>,
}

/// Versioned content access backed by a version store and a search backend
///
/// Cheap to clone; clones share every cache.
#[derive(Debug, Clone)]
pub struct ContentManager {
    inner: Arc<ManagerInner>,
}

impl ContentManager {
    /// Create new manager with default configuration
    #[must_use]
    pub fn new(store: Arc<dyn VersionStore>, backend: Arc<dyn SearchBackend>) -> Self {
        Self::assemble(store, backend, ContentConfig::default(), TypeRegistry::with_defaults())
    }

    /// Create new manager with configuration
    ///
    /// # Errors
    /// Returns [`ContentError::Config`] if the configuration is invalid.
    pub fn with_config(
        store: Arc<dyn VersionStore>,
        backend: Arc<dyn SearchBackend>,
        config: ContentConfig,
    ) -> Result<Self, ContentError> {
        Self::with_registry(store, backend, config, TypeRegistry::with_defaults())
    }

    /// Create new manager with configuration and a custom type registry
    ///
    /// # Errors
    /// Returns [`ContentError::Config`] if the configuration is invalid.
    pub fn with_registry(
        store: Arc<dyn VersionStore>,
        backend: Arc<dyn SearchBackend>,
        config: ContentConfig,
        registry: TypeRegistry,
    ) -> Result<Self, ContentError> {
        config.validate()?;
        Ok(Self::assemble(store, backend, config, registry))
    }

    fn assemble(
        store: Arc<dyn VersionStore>,
        backend: Arc<dyn SearchBackend>,
        config: ContentConfig,
        registry: TypeRegistry,
    ) -> Self {
        let mapper = ContentMapper::new(registry).with_strict(config.strict_types);
        let builder = VersionCacheBuilder::new(Arc::clone(&store), mapper.clone())
            .with_suffix(config.content_suffix.clone())
            .with_published_only(config.published_only);
        let inner = ManagerInner {
            caches: VersionCacheStore::new(config.max_cached_versions),
            validator: IntegrityValidator::new(Arc::clone(&store)),
            synchronizer: SearchSynchronizer::new(backend, mapper.clone()),
            reports: DashMap::new(),
            builder,
            mapper,
            store,
            config,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ContentConfig {
        &self.inner.config
    }

    /// Object mapper used for files and search hits
    #[inline]
    #[must_use]
    pub fn mapper(&self) -> &ContentMapper {
        &self.inner.mapper
    }

    /// Version store content is read from
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.inner.store
    }

    /// Search backend versions are indexed into
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        self.inner.synchronizer.backend()
    }

    // -- cache coordination ------------------------------------------------

    /// Make `version` available; `true` once it is READY
    ///
    /// Returns `false` for unknown versions, store failures, timeouts and
    /// search outages. In the last case id lookups still work.
    pub async fn ensure_cache(&self, version: &VersionId) -> bool {
        match self.try_ensure_cache(version).await {
            Ok(state) => state.is_ready(),
            Err(err) if err.is_not_found() => false,
            Err(err) => {
                tracing::error!("Unable to prepare content version {}: {}", version, err);
                false
            }
        }
    }

    /// Make `version` available and report the state it reached
    ///
    /// # Errors
    /// - [`ContentError::VersionNotFound`] if the store cannot resolve it
    /// - [`ContentError::Store`] on store failure during the build
    /// - [`ContentError::Timeout`] past the configured deadline
    pub async fn try_ensure_cache(&self, version: &VersionId) -> Result<VersionState, ContentError> {
        self.ensure(version).await.map(|(_, state)| state)
    }

    /// State of a version without triggering any work
    pub async fn version_state(&self, version: &VersionId) -> VersionState {
        if !self.inner.caches.contains(version) {
            return VersionState::Absent;
        }
        match self.backend().has_index(version).await {
            Ok(true) => VersionState::Ready,
            Ok(false) | Err(_) => VersionState::CacheOnly,
        }
    }

    /// Run the coordination in its own task so the build survives a
    /// caller that stops waiting, and a panic stays contained.
    async fn ensure(
        &self,
        version: &VersionId,
    ) -> Result<(Arc<VersionCache>, VersionState), ContentError> {
        let this = self.clone();
        let target = version.clone();
        let task = tokio::spawn(async move { this.ensure_now(&target).await });

        let Some(limit) = self.inner.config.ensure_cache_timeout() else {
            return task.await?;
        };
        match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                tracing::warn!(
                    "Content version {} not ready within {:?}; continuing in background",
                    version.short(),
                    limit
                );
                Err(ContentError::Timeout {
                    duration_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    async fn ensure_now(
        &self,
        version: &VersionId,
    ) -> Result<(Arc<VersionCache>, VersionState), ContentError> {
        let inner = &self.inner;
        let built_here = Arc::new(AtomicBool::new(false));
        let cache = {
            let builder = inner.builder.clone();
            let flag = Arc::clone(&built_here);
            let target = version.clone();
            inner
                .caches
                .try_get_or_build(version, async move {
                    flag.store(true, AtomicOrdering::SeqCst);
                    builder.build(&target).await
                })
                .await?
        };

        let indexed = if built_here.load(AtomicOrdering::SeqCst) {
            tracing::debug!("Content version {} is {}", version.short(), VersionState::CacheOnly);
            let (_, indexed) = tokio::join!(
                self.refresh_report(&cache),
                inner.synchronizer.index_version(&cache)
            );
            indexed
        } else {
            inner.synchronizer.index_version(&cache).await
        };

        let state = match indexed {
            Ok(IndexOutcome::Indexed { .. } | IndexOutcome::AlreadyIndexed) => VersionState::Ready,
            Err(err) => {
                tracing::warn!(
                    "Search index for {} unavailable, serving from cache only: {}",
                    version.short(),
                    err
                );
                VersionState::CacheOnly
            }
        };
        Ok((cache, state))
    }

    /// Ensure the version, mapping "no such version" to `None`
    async fn cached(
        &self,
        version: &VersionId,
    ) -> Result<Option<(Arc<VersionCache>, VersionState)>, ContentError> {
        match self.ensure(version).await {
            Ok(found) => Ok(Some(found)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn refresh_report(&self, cache: &VersionCache) -> Option<Arc<IntegrityReport>> {
        match self.inner.validator.validate(cache).await {
            Ok(report) => {
                let report = Arc::new(report);
                self.inner
                    .reports
                    .insert(cache.version().clone(), Arc::clone(&report));
                Some(report)
            }
            Err(err) => {
                tracing::warn!(
                    "Integrity check for {} could not run: {}",
                    cache.version().short(),
                    err
                );
                None
            }
        }
    }

    // -- cache reads -------------------------------------------------------

    /// Node by id
    ///
    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn get_by_id(
        &self,
        id: &str,
        version: &VersionId,
    ) -> Result<Option<Arc<ContentNode>>, ContentError> {
        Ok(self
            .cached(version)
            .await?
            .and_then(|(cache, _)| cache.get(id).cloned()))
    }

    /// Nodes whose id starts with `prefix`, in id order
    ///
    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn get_by_id_prefix(
        &self,
        prefix: &str,
        version: &VersionId,
    ) -> Result<Vec<Arc<ContentNode>>, ContentError> {
        Ok(self
            .cached(version)
            .await?
            .map(|(cache, _)| cache.with_prefix(prefix).cloned().collect())
            .unwrap_or_default())
    }

    /// Nodes of one type, at most `limit`
    ///
    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn find_by_type(
        &self,
        kind: &str,
        version: &VersionId,
        limit: Option<usize>,
    ) -> Result<Vec<Arc<ContentNode>>, ContentError> {
        Ok(self
            .cached(version)
            .await?
            .map(|(cache, _)| cache.of_type(kind, limit))
            .unwrap_or_default())
    }

    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn get_tags_list(&self, version: &VersionId) -> Result<BTreeSet<String>, ContentError> {
        Ok(self
            .cached(version)
            .await?
            .map(|(cache, _)| cache.tags())
            .unwrap_or_default())
    }

    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn get_all_units(&self, version: &VersionId) -> Result<BTreeSet<String>, ContentError> {
        Ok(self
            .cached(version)
            .await?
            .map(|(cache, _)| cache.units())
            .unwrap_or_default())
    }

    // -- search reads ------------------------------------------------------

    /// Nodes carrying any of `tags`
    ///
    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn find_by_tags(
        &self,
        version: &VersionId,
        tags: &[String],
        start: usize,
        limit: Option<usize>,
    ) -> Result<ResultsWrapper<ContentNode>, ContentError> {
        if tags.is_empty() || !self.search_ready(version).await? {
            return Ok(ResultsWrapper::empty());
        }
        let hits = self
            .backend()
            .term_search(version, CONTENT_DOC_TYPE, tags, "tags")
            .await;
        self.page_of(version, hits, start, limit)
    }

    /// Free-text search over the configured fields, best match first
    ///
    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn search_for_content(
        &self,
        version: &VersionId,
        query: &str,
        start: usize,
        limit: Option<usize>,
    ) -> Result<ResultsWrapper<ContentNode>, ContentError> {
        if query.trim().is_empty() || !self.search_ready(version).await? {
            return Ok(ResultsWrapper::empty());
        }
        let hits = self
            .backend()
            .fuzzy_search(version, CONTENT_DOC_TYPE, query, &self.inner.config.search_fields)
            .await;
        self.page_of(version, hits, start, limit)
    }

    /// Exact-match filter: every field must match one of its values
    ///
    /// # Errors
    /// - [`ContentError::Search`] for an empty filter
    /// - [`ContentError`] if the version could not be prepared
    pub async fn find_by_field_names(
        &self,
        version: &VersionId,
        fields: &BTreeMap<String, Vec<String>>,
        start: usize,
        limit: Option<usize>,
    ) -> Result<ResultsWrapper<ContentNode>, ContentError> {
        if fields.is_empty() {
            return Err(SearchError::InvalidQuery("no fields to match".to_string()).into());
        }
        if !self.search_ready(version).await? {
            return Ok(ResultsWrapper::empty());
        }
        let hits = self
            .backend()
            .field_search(version, CONTENT_DOC_TYPE, fields)
            .await;
        self.page_of(version, hits, start, limit)
    }

    async fn search_ready(&self, version: &VersionId) -> Result<bool, ContentError> {
        Ok(match self.cached(version).await? {
            Some((_, VersionState::Ready)) => true,
            Some((_, state)) => {
                tracing::debug!("Search for {} skipped: version is {}", version.short(), state);
                false
            }
            None => false,
        })
    }

    fn page_of(
        &self,
        version: &VersionId,
        hits: Result<Vec<SearchHit>, SearchError>,
        start: usize,
        limit: Option<usize>,
    ) -> Result<ResultsWrapper<ContentNode>, ContentError> {
        let hits = match hits {
            Ok(hits) => hits,
            Err(err @ (SearchError::Unavailable(_) | SearchError::MissingIndex(_))) => {
                tracing::warn!("Search on {} degraded to no results: {}", version.short(), err);
                return Ok(ResultsWrapper::empty());
            }
            Err(err) => return Err(err.into()),
        };
        let page = ResultsWrapper::paginate(hits, start, limit);
        let results = page
            .results
            .iter()
            .filter_map(|hit| match self.inner.mapper.decode_str(&hit.source, &hit.id) {
                Ok(node) => Some(node),
                Err(err) => {
                    tracing::warn!("Unable to decode search hit {}: {}", hit.id, err);
                    None
                }
            })
            .collect();
        Ok(ResultsWrapper::new(results, page.total_results))
    }

    // -- integrity ---------------------------------------------------------

    /// Validate a version; `false` if it is inconsistent or unavailable
    pub async fn validate(&self, version: &VersionId) -> bool {
        match self.cached(version).await {
            Ok(Some((cache, _))) => self
                .refresh_report(&cache)
                .await
                .is_some_and(|report| report.is_valid()),
            Ok(None) => false,
            Err(err) => {
                tracing::error!("Unable to validate content version {}: {}", version, err);
                false
            }
        }
    }

    /// Latest integrity report, computing it if none is held
    ///
    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn integrity_report(
        &self,
        version: &VersionId,
    ) -> Result<Option<Arc<IntegrityReport>>, ContentError> {
        let Some((cache, _)) = self.cached(version).await? else {
            return Ok(None);
        };
        let held = self.inner.reports.get(version).map(|r| Arc::clone(r.value()));
        Ok(match held {
            Some(report) => Some(report),
            None => self.refresh_report(&cache).await,
        })
    }

    /// Every known problem of a version keyed by node id or file
    ///
    /// Combines missing related ids and assets with the parse failures and
    /// duplicate-id conflicts recorded while building.
    ///
    /// # Errors
    /// Returns [`ContentError`] if the version could not be prepared.
    pub async fn problem_map(&self, version: &VersionId) -> Result<Option<ProblemMap>, ContentError> {
        let Some((cache, _)) = self.cached(version).await? else {
            return Ok(None);
        };
        let mut problems = self
            .integrity_report(version)
            .await?
            .map(|report| report.problems.clone())
            .unwrap_or_default();

        let build = cache.report();
        for failure in &build.parse_failures {
            problems
                .entry(failure.path().to_string())
                .or_default()
                .push(failure.to_string());
        }
        for conflict in &build.conflicts {
            problems.entry(conflict.id.clone()).or_default().push(format!(
                "duplicate id with different content in {} (kept {})",
                conflict.skipped_source,
                conflict.kept_source.as_deref().unwrap_or("?")
            ));
        }
        Ok(Some(problems))
    }

    // -- versions ----------------------------------------------------------

    /// # Errors
    /// Returns [`ContentError::Store`] on store failure.
    pub async fn list_versions(&self) -> Result<Vec<VersionId>, ContentError> {
        Ok(self.inner.store.list_versions().await?)
    }

    /// # Errors
    /// Returns [`ContentError::Store`] on store failure.
    pub async fn latest_version(&self) -> Result<Option<VersionId>, ContentError> {
        Ok(self.inner.store.latest_version().await?)
    }

    /// Whether the store can resolve `version`
    ///
    /// # Errors
    /// Returns [`ContentError::Store`] on store failure.
    pub async fn is_valid_version(&self, version: &VersionId) -> Result<bool, ContentError> {
        Ok(self.inner.store.resolve(version).await?.is_some())
    }

    /// Turn a selector into a resolvable version id
    ///
    /// # Errors
    /// - [`ContentError::NoVersions`] for `Latest` on an empty store
    /// - [`ContentError::VersionNotFound`] for an unknown pinned version
    pub async fn resolve_selector(&self, selector: &VersionSelector) -> Result<VersionId, ContentError> {
        match selector {
            VersionSelector::Latest => self.latest_version().await?.ok_or(ContentError::NoVersions),
            VersionSelector::Pinned(version) => {
                if self.is_valid_version(version).await? {
                    Ok(version.clone())
                } else {
                    Err(ContentError::VersionNotFound(version.clone()))
                }
            }
        }
    }

    /// Recency order of two versions; `Greater` when `a` is newer
    ///
    /// # Errors
    /// Returns [`ContentError::VersionNotFound`] if either is not in the
    /// store history.
    pub async fn compare_versions(&self, a: &VersionId, b: &VersionId) -> Result<Ordering, ContentError> {
        let history = self.list_versions().await?;
        let position = |version: &VersionId| {
            history
                .iter()
                .position(|known| known == version)
                .ok_or_else(|| ContentError::VersionNotFound(version.clone()))
        };
        let (a_pos, b_pos) = (position(a)?, position(b)?);
        // history is newest first
        Ok(b_pos.cmp(&a_pos))
    }

    /// Raw bytes of a file, for serving assets
    ///
    /// # Errors
    /// - [`ContentError::InvalidPath`] for a path escaping the tree
    /// - [`ContentError::Store`] on store failure
    pub async fn get_file_bytes(
        &self,
        version: &VersionId,
        path: &str,
    ) -> Result<Option<Vec<u8>>, ContentError> {
        let path = TreePath::parse(path)?;
        Ok(self.inner.store.read_file(version, &path).await?)
    }

    // -- eviction ----------------------------------------------------------

    /// Versions currently held in memory
    #[must_use]
    pub fn cached_versions(&self) -> Vec<VersionId> {
        self.inner.caches.versions()
    }

    /// Drop one version from memory; its search index is kept
    pub async fn evict_version(&self, version: &VersionId) {
        self.inner.caches.invalidate(version).await;
        self.inner.reports.remove(version);
        self.inner.synchronizer.forget(version);
    }

    /// Drop one version from memory and from the search backend
    ///
    /// # Errors
    /// Returns [`ContentError::Search`] if the index could not be dropped.
    pub async fn clear_version(&self, version: &VersionId) -> Result<(), ContentError> {
        tracing::info!("Clearing content version {}", version.short());
        self.evict_version(version).await;
        self.backend().drop_index(version).await?;
        Ok(())
    }

    /// Drop every version from memory and from the search backend
    ///
    /// The next read of any version rebuilds it from the store.
    ///
    /// # Errors
    /// Returns [`ContentError::Search`] if the indices could not be dropped;
    /// memory is cleared regardless.
    pub async fn clear_cache(&self) -> Result<(), ContentError> {
        tracing::info!("Clearing all content caches");
        self.inner.caches.invalidate_all();
        self.inner.reports.clear();
        self.inner.synchronizer.forget_all();
        self.backend().drop_all().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isaac_search::MemorySearchBackend;
    use isaac_store::MemoryVersionStore;
    use pretty_assertions::assert_eq;

    fn v(raw: &str) -> VersionId {
        VersionId::new(raw).unwrap()
    }

    fn manager() -> (ContentManager, Arc<MemoryVersionStore>, Arc<MemorySearchBackend>) {
        let store = Arc::new(MemoryVersionStore::new());
        store
            .commit_as(
                v("v1"),
                [
                    (
                        "physics/forces.json",
                        r#"{"id":"phys_forces","type":"page","title":"Forces","tags":["physics"],
                            "children":[{"id":"q_force","type":"isaacNumericQuestion","title":"Net force",
                                         "choices":[{"type":"quantity","value":"5","units":"N","correct":true}]}]}"#,
                    ),
                    (
                        "physics/energy.json",
                        r#"{"id":"phys_energy","type":"page","title":"Energy","tags":["physics","energy"]}"#,
                    ),
                    (
                        "chemistry/bonds.json",
                        r#"{"id":"chem_bonds","type":"page","title":"Covalent bonds","tags":["chemistry"]}"#,
                    ),
                ],
            )
            .unwrap();
        store
            .commit_as(v("v2"), [("a.json", r#"{"id":"a","type":"page"}"#)])
            .unwrap();
        let backend = Arc::new(MemorySearchBackend::new());
        let manager = ContentManager::new(store.clone(), backend.clone());
        (manager, store, backend)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn unknown_version_stays_absent() {
        let (manager, _, _) = manager();
        assert!(!manager.ensure_cache(&v("ghost")).await);
        assert!(matches!(
            manager.try_ensure_cache(&v("ghost")).await,
            Err(ContentError::VersionNotFound(_))
        ));
        assert_eq!(manager.version_state(&v("ghost")).await, VersionState::Absent);
        assert!(manager.cached_versions().is_empty());
        assert_eq!(manager.get_by_id("a", &v("ghost")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn cache_reads() {
        let (manager, _, _) = manager();
        let version = v("v1");
        assert!(manager.ensure_cache(&version).await);
        assert_eq!(manager.version_state(&version).await, VersionState::Ready);

        let node = manager.get_by_id("q_force", &version).await.unwrap().unwrap();
        assert_eq!(node.title.as_deref(), Some("Net force"));

        let prefixed: Vec<String> = manager
            .get_by_id_prefix("phys_", &version)
            .await
            .unwrap()
            .iter()
            .filter_map(|n| n.id.clone())
            .collect();
        assert_eq!(prefixed, strings(&["phys_energy", "phys_forces"]));

        assert_eq!(manager.find_by_type("page", &version, None).await.unwrap().len(), 3);
        assert_eq!(manager.find_by_type("page", &version, Some(1)).await.unwrap().len(), 1);
        assert_eq!(
            manager.get_tags_list(&version).await.unwrap().into_iter().collect::<Vec<_>>(),
            strings(&["chemistry", "energy", "physics"])
        );
        assert_eq!(
            manager.get_all_units(&version).await.unwrap().into_iter().collect::<Vec<_>>(),
            strings(&["N"])
        );
    }

    #[tokio::test]
    async fn search_reads_decode_hits() {
        let (manager, _, _) = manager();
        let version = v("v1");

        let tagged = manager
            .find_by_tags(&version, &strings(&["energy", "chemistry"]), 0, None)
            .await
            .unwrap();
        assert_eq!(tagged.total_results, 2);
        let ids: Vec<_> = tagged.results.iter().filter_map(|n| n.id()).collect();
        assert_eq!(ids, vec!["chem_bonds", "phys_energy"]);

        let found = manager
            .search_for_content(&version, "covalent", 0, Some(10))
            .await
            .unwrap();
        assert_eq!(found.results.len(), 1);
        assert_eq!(found.results[0].id(), Some("chem_bonds"));
        assert_eq!(
            found.results[0].canonical_source_file.as_deref(),
            Some("chemistry/bonds.json")
        );

        let mut filter = BTreeMap::new();
        filter.insert("type".to_string(), strings(&["page"]));
        filter.insert("tags".to_string(), strings(&["physics"]));
        let page = manager
            .find_by_field_names(&version, &filter, 1, Some(1))
            .await
            .unwrap();
        assert_eq!(page.total_results, 2);
        assert_eq!(page.results.len(), 1);

        assert!(matches!(
            manager.find_by_field_names(&version, &BTreeMap::new(), 0, None).await,
            Err(ContentError::Search(SearchError::InvalidQuery(_)))
        ));
    }

    #[tokio::test]
    async fn outage_degrades_to_cache_only() {
        let (manager, _, backend) = manager();
        let version = v("v1");
        backend.set_available(false);

        assert!(!manager.ensure_cache(&version).await);
        assert_eq!(
            manager.try_ensure_cache(&version).await.unwrap(),
            VersionState::CacheOnly
        );
        assert!(manager.get_by_id("phys_forces", &version).await.unwrap().is_some());
        assert!(manager
            .search_for_content(&version, "energy", 0, None)
            .await
            .unwrap()
            .is_empty());

        backend.set_available(true);
        assert!(manager.ensure_cache(&version).await);
        assert_eq!(manager.search_for_content(&version, "energy", 0, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn version_ordering_and_selection() {
        let (manager, _, _) = manager();
        assert_eq!(manager.list_versions().await.unwrap(), vec![v("v2"), v("v1")]);
        assert_eq!(
            manager.compare_versions(&v("v2"), &v("v1")).await.unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            manager.compare_versions(&v("v1"), &v("v1")).await.unwrap(),
            Ordering::Equal
        );
        assert!(manager.compare_versions(&v("v1"), &v("nope")).await.is_err());

        assert_eq!(
            manager.resolve_selector(&VersionSelector::Latest).await.unwrap(),
            v("v2")
        );
        assert!(matches!(
            manager.resolve_selector(&VersionSelector::Pinned(v("nope"))).await,
            Err(ContentError::VersionNotFound(_))
        ));
        assert!(manager.is_valid_version(&v("v1")).await.unwrap());
    }

    #[tokio::test]
    async fn file_access() {
        let (manager, _, _) = manager();
        let bytes = manager
            .get_file_bytes(&v("v2"), "a.json")
            .await
            .unwrap()
            .unwrap();
        assert!(bytes.starts_with(b"{"));
        assert_eq!(manager.get_file_bytes(&v("v2"), "b.json").await.unwrap(), None);
        assert!(matches!(
            manager.get_file_bytes(&v("v2"), "../etc/passwd").await,
            Err(ContentError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn clearing_forces_rebuild() {
        let (manager, _, backend) = manager();
        assert!(manager.ensure_cache(&v("v1")).await);
        assert!(manager.ensure_cache(&v("v2")).await);
        assert_eq!(manager.cached_versions(), vec![v("v1"), v("v2")]);

        manager.clear_version(&v("v1")).await.unwrap();
        assert_eq!(manager.version_state(&v("v1")).await, VersionState::Absent);
        assert!(!backend.has_index(&v("v1")).await.unwrap());
        assert_eq!(manager.version_state(&v("v2")).await, VersionState::Ready);

        manager.clear_cache().await.unwrap();
        assert_eq!(manager.version_state(&v("v2")).await, VersionState::Absent);
        assert!(manager.ensure_cache(&v("v2")).await);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let store = Arc::new(MemoryVersionStore::new());
        let backend = Arc::new(MemorySearchBackend::new());
        let config = ContentConfig::default().with_max_cached_versions(0);
        assert!(matches!(
            ContentManager::with_config(store, backend, config),
            Err(ContentError::Config(_))
        ));
    }
}
