//! Per-version content caches
//!
//! A [`VersionCache`] is immutable once built. The [`VersionCacheStore`]
//! only ever publishes complete caches, so a reader either finds nothing
//! for a version or the full, consistent id map.

use crate::error::{BuildError, ParseError};
use isaac_model::{ContentNode, VersionId};
use moka::future::Cache;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

/// Two files defining the same id with different content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateConflict {
    /// Id defined twice
    pub id: String,
    /// File the cached node came from
    pub kept_source: Option<String>,
    /// File whose node was dropped
    pub skipped_source: String,
}

/// What happened while building one version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Content files walked
    pub files: usize,
    /// Files skipped because they did not parse
    pub parse_failures: Vec<ParseError>,
    /// Ids seen again with identical content
    pub reused: usize,
    /// Ids seen again with different content
    pub conflicts: Vec<DuplicateConflict>,
    /// Root nodes dropped as unpublished
    pub unpublished: usize,
    /// Local figure sources, resolved path → first file referencing it
    pub asset_refs: BTreeMap<String, String>,
}

/// Id → node map for one version
#[derive(Debug, Clone)]
pub struct VersionCache {
    version: VersionId,
    nodes: BTreeMap<String, Arc<ContentNode>>,
    report: BuildReport,
}

impl VersionCache {
    /// Create new cache
    #[must_use]
    pub fn new(
        version: VersionId,
        nodes: BTreeMap<String, Arc<ContentNode>>,
        report: BuildReport,
    ) -> Self {
        Self {
            version,
            nodes,
            report,
        }
    }

    /// Version this cache was built from
    #[inline]
    #[must_use]
    pub fn version(&self) -> &VersionId {
        &self.version
    }

    /// Build diagnostics
    #[inline]
    #[must_use]
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Node by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<ContentNode>> {
        self.nodes.get(id)
    }

    /// Whether an id is defined
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of ids
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the version defined no ids
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<ContentNode>> {
        self.nodes.values()
    }

    /// Ids in order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Nodes whose id starts with `prefix`, in id order
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Arc<ContentNode>> {
        self.nodes
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .take_while(move |(id, _)| id.starts_with(prefix))
            .map(|(_, node)| node)
    }

    /// Nodes of one type in id order, at most `limit` of them
    #[must_use]
    pub fn of_type(&self, kind: &str, limit: Option<usize>) -> Vec<Arc<ContentNode>> {
        self.nodes
            .values()
            .filter(|n| n.kind == kind)
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Union of tags over every node
    #[must_use]
    pub fn tags(&self) -> BTreeSet<String> {
        self.nodes
            .values()
            .flat_map(|n| n.tags.iter().cloned())
            .collect()
    }

    /// Union of units declared by quantity choices anywhere in the version
    #[must_use]
    pub fn units(&self) -> BTreeSet<String> {
        self.nodes
            .values()
            .flat_map(|n| n.flatten())
            .filter_map(ContentNode::units)
            .map(ToString::to_string)
            .collect()
    }
}

/// Process-wide map of built version caches
///
/// Wraps a moka future cache. [`VersionCacheStore::try_get_or_build`]
/// coalesces concurrent builds of one version into a single run; callers
/// arriving mid-build wait for its result.
#[derive(Debug, Clone)]
pub struct VersionCacheStore {
    inner: Cache<VersionId, Arc<VersionCache>>,
}

impl VersionCacheStore {
    /// Create new store holding at most `max_versions` versions
    #[inline]
    #[must_use]
    pub fn new(max_versions: u64) -> Self {
        Self {
            inner: Cache::builder().max_capacity(max_versions).build(),
        }
    }

    /// Built cache for a version
    pub async fn get(&self, version: &VersionId) -> Option<Arc<VersionCache>> {
        self.inner.get(version).await
    }

    /// Whether a version is built
    #[inline]
    #[must_use]
    pub fn contains(&self, version: &VersionId) -> bool {
        self.inner.contains_key(version)
    }

    /// Return the cached version or run `build`, at most once concurrently
    ///
    /// A failed build is not cached; the next call tries again.
    ///
    /// # Errors
    /// Returns the build error, shared with every caller that waited on it.
    pub async fn try_get_or_build<F>(
        &self,
        version: &VersionId,
        build: F,
    ) -> Result<Arc<VersionCache>, Arc<BuildError>>
    where
        F: Future<Output = Result<VersionCache, BuildError>>,
    {
        self.inner
            .try_get_with(version.clone(), async move { build.await.map(Arc::new) })
            .await
    }

    /// Publish a finished cache
    pub async fn insert(&self, cache: VersionCache) {
        self.inner
            .insert(cache.version().clone(), Arc::new(cache))
            .await;
    }

    /// Drop one version
    pub async fn invalidate(&self, version: &VersionId) {
        self.inner.invalidate(version).await;
    }

    /// Drop every version
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Versions currently held, sorted
    #[must_use]
    pub fn versions(&self) -> Vec<VersionId> {
        let mut versions: Vec<VersionId> = self
            .inner
            .iter()
            .map(|(version, _)| VersionId::clone(&version))
            .collect();
        versions.sort();
        versions
    }
}

impl Default for VersionCacheStore {
    fn default() -> Self {
        Self::new(crate::DEFAULT_MAX_VERSIONS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isaac_model::{ContentBody, QuantityBody, QuestionBody};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn v(raw: &str) -> VersionId {
        VersionId::new(raw).unwrap()
    }

    fn sample(version: &str) -> VersionCache {
        let question = ContentNode::new("isaacNumericQuestion")
            .with_id("q1")
            .with_tag("mechanics")
            .with_body(ContentBody::Question(QuestionBody {
                choices: vec![ContentNode::new("quantity").with_body(ContentBody::Quantity(
                    QuantityBody {
                        correct: true,
                        units: Some("N".to_string()),
                        ..QuantityBody::default()
                    },
                ))],
                ..QuestionBody::default()
            }));
        let mut nodes = BTreeMap::new();
        for node in [
            ContentNode::new("page").with_id("phys_forces").with_tag("physics"),
            ContentNode::new("page").with_id("phys_energy").with_tag("physics"),
            ContentNode::new("page").with_id("chem_bonds").with_tag("chemistry"),
            question,
        ] {
            nodes.insert(node.id.clone().unwrap(), Arc::new(node));
        }
        VersionCache::new(v(version), nodes, BuildReport::default())
    }

    #[test]
    fn prefix_lookup_is_ordered() {
        let cache = sample("abc123");
        let ids: Vec<&str> = cache
            .with_prefix("phys_")
            .filter_map(|n| n.id())
            .collect();
        assert_eq!(ids, vec!["phys_energy", "phys_forces"]);
        assert_eq!(cache.with_prefix("zzz").count(), 0);
    }

    #[test]
    fn type_scan_honours_limit() {
        let cache = sample("abc123");
        assert_eq!(cache.of_type("page", None).len(), 3);
        assert_eq!(cache.of_type("page", Some(2)).len(), 2);
        assert!(cache.of_type("video", None).is_empty());
    }

    #[test]
    fn tag_and_unit_unions() {
        let cache = sample("abc123");
        assert_eq!(
            cache.tags().into_iter().collect::<Vec<_>>(),
            vec!["chemistry", "mechanics", "physics"]
        );
        assert_eq!(cache.units().into_iter().collect::<Vec<_>>(), vec!["N"]);
    }

    #[tokio::test]
    async fn failed_builds_are_not_cached() {
        let store = VersionCacheStore::new(8);
        let version = v("ghost");
        let result = store
            .try_get_or_build(&version, async {
                Err(BuildError::VersionNotFound(VersionId::new("ghost").unwrap()))
            })
            .await;
        assert!(result.is_err());
        assert!(!store.contains(&version));
        assert!(store.get(&version).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_builds_run_once() {
        let store = VersionCacheStore::new(8);
        let version = v("abc123");
        let runs = Arc::new(AtomicUsize::new(0));

        let calls = (0..8).map(|_| {
            let store = store.clone();
            let version = version.clone();
            let runs = Arc::clone(&runs);
            async move {
                store
                    .try_get_or_build(&version, async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(sample("abc123"))
                    })
                    .await
            }
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_ref().is_ok_and(|c| c.len() == 4)));
        assert!(store.contains(&version));
    }

    #[tokio::test]
    async fn invalidate_drops_versions() {
        let store = VersionCacheStore::default();
        store.insert(sample("a")).await;
        store.insert(sample("b")).await;
        assert!(store.contains(&v("a")));

        store.invalidate(&v("a")).await;
        assert!(!store.contains(&v("a")));
        assert!(store.get(&v("b")).await.is_some());

        store.invalidate_all();
        assert!(store.get(&v("b")).await.is_none());
    }
}
