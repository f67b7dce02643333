//! Version cache builder
//!
//! Walks one version tree, parses every content file and flattens the
//! resulting trees into an id → node map. Files are processed in
//! [`TreePath`](isaac_model::TreePath) order, so when two files define the
//! same id with different content the lexicographically first file wins,
//! for every build of the same tree.

use crate::cache::{BuildReport, DuplicateConflict, VersionCache};
use crate::error::BuildError;
use crate::mapper::ContentMapper;
use isaac_model::{is_external_reference, ContentNode, VersionId};
use isaac_store::VersionStore;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Default content file suffix
pub const DEFAULT_CONTENT_SUFFIX: &str = ".json";

/// Builds [`VersionCache`]s from a [`VersionStore`]
#[derive(Debug, Clone)]
pub struct VersionCacheBuilder {
    store: Arc<dyn VersionStore>,
    mapper: ContentMapper,
    suffix: String,
    published_only: bool,
}

impl VersionCacheBuilder {
    /// Create new builder
    #[must_use]
    pub fn new(store: Arc<dyn VersionStore>, mapper: ContentMapper) -> Self {
        Self {
            store,
            mapper,
            suffix: DEFAULT_CONTENT_SUFFIX.to_string(),
            published_only: false,
        }
    }

    /// With content file suffix
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// With unpublished content skipped
    #[must_use]
    pub fn with_published_only(mut self, published_only: bool) -> Self {
        self.published_only = published_only;
        self
    }

    /// Mapper in use
    #[inline]
    #[must_use]
    pub fn mapper(&self) -> &ContentMapper {
        &self.mapper
    }

    /// Build the cache for `version`
    ///
    /// Per-file parse failures and duplicate ids are recorded in the
    /// [`BuildReport`] and never fail the build.
    ///
    /// # Errors
    /// - [`BuildError::VersionNotFound`] if the store cannot resolve the version
    /// - [`BuildError::Store`] on store I/O failure
    pub async fn build(&self, version: &VersionId) -> Result<VersionCache, BuildError> {
        let Some(tree) = self.store.resolve(version).await? else {
            tracing::error!("Unable to locate content version {}", version);
            return Err(BuildError::VersionNotFound(version.clone()));
        };

        tracing::info!("Populating content cache for version {} ...", version.short());
        let mut entries = self.store.walk(&tree, &self.suffix).await?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        let mut nodes: BTreeMap<String, Arc<ContentNode>> = BTreeMap::new();
        let mut report = BuildReport {
            files: entries.len(),
            ..BuildReport::default()
        };

        for entry in entries {
            let source = entry.path.to_string();
            let root = match self.mapper.parse_document(&entry.bytes, &entry.path) {
                Ok(root) => root,
                Err(err) => {
                    tracing::warn!("Unable to parse {} as content; skipping file: {}", source, err);
                    report.parse_failures.push(err);
                    continue;
                }
            };

            let root = if self.published_only {
                let Some(root) = root.prune_unpublished() else {
                    tracing::debug!("Skipping unpublished content in {}", source);
                    report.unpublished += 1;
                    continue;
                };
                root
            } else {
                root
            };

            for node in root.flatten() {
                if let Some(src) = node.asset_src().filter(|src| !is_external_reference(src)) {
                    report
                        .asset_refs
                        .entry(src.to_string())
                        .or_insert_with(|| source.clone());
                }
                let Some(id) = node.id() else {
                    continue;
                };
                match nodes.entry(id.to_string()) {
                    Entry::Vacant(slot) => {
                        tracing::debug!("Loading into cache: {} ({}) from {}", id, node.kind, source);
                        slot.insert(Arc::new(node.clone()));
                    }
                    Entry::Occupied(existing) if existing.get().same_content(node) => {
                        tracing::info!("Resource ({}) already seen in cache. Skipping {}", id, source);
                        report.reused += 1;
                    }
                    Entry::Occupied(existing) => {
                        let kept = existing.get();
                        tracing::warn!(
                            "Resource with duplicate ID ({}) and different content detected; keeping {} ({}), skipping {} ({})",
                            id,
                            kept.canonical_source_file.as_deref().unwrap_or("?"),
                            kept.fingerprint().short(),
                            source,
                            node.fingerprint().short()
                        );
                        report.conflicts.push(DuplicateConflict {
                            id: id.to_string(),
                            kept_source: kept.canonical_source_file.clone(),
                            skipped_source: source.clone(),
                        });
                    }
                }
            }
        }

        tracing::info!(
            "Content cache population for {} completed: {} ids from {} files ({} unparseable, {} conflicts)",
            version.short(),
            nodes.len(),
            report.files,
            report.parse_failures.len(),
            report.conflicts.len()
        );
        Ok(VersionCache::new(version.clone(), nodes, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isaac_store::MemoryVersionStore;
    use pretty_assertions::assert_eq;

    fn builder(store: MemoryVersionStore) -> VersionCacheBuilder {
        VersionCacheBuilder::new(Arc::new(store), ContentMapper::default())
    }

    fn v(raw: &str) -> VersionId {
        VersionId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn builds_flattened_cache() {
        let store = MemoryVersionStore::new();
        store
            .commit_as(
                v("abc123"),
                [
                    (
                        "page1.json",
                        r#"{"id":"p1","type":"page","relatedContent":["p2"],
                            "children":[{"id":"p1-fig","type":"figure","src":"diagram.png"},
                                        {"type":"content","value":"anonymous"}]}"#,
                    ),
                    ("page2.json", r#"{"id":"p2","type":"page"}"#),
                    ("diagram.png", "png"),
                ],
            )
            .unwrap();
        let cache = builder(store).build(&v("abc123")).await.unwrap();

        assert_eq!(cache.ids().collect::<Vec<_>>(), vec!["p1", "p1-fig", "p2"]);
        assert_eq!(cache.report().files, 2);
        let fig = cache.get("p1-fig").unwrap();
        assert_eq!(fig.canonical_source_file.as_deref(), Some("page1.json"));
        assert_eq!(fig.asset_src(), Some("diagram.png"));
        // the parent keeps its children intact
        assert_eq!(cache.get("p1").unwrap().children.len(), 2);
    }

    #[tokio::test]
    async fn records_local_assets_of_anonymous_figures() {
        let store = MemoryVersionStore::new();
        store
            .commit_as(
                v("abc123"),
                [
                    ("figs/fig.json", r#"{"type":"figure","src":"diagram.png"}"#),
                    ("web.json", r#"{"type":"image","src":"https://example.org/a.png"}"#),
                ],
            )
            .unwrap();
        let cache = builder(store).build(&v("abc123")).await.unwrap();
        assert!(cache.is_empty());
        assert_eq!(
            cache.report().asset_refs.iter().collect::<Vec<_>>(),
            vec![(&"figs/diagram.png".to_string(), &"figs/fig.json".to_string())]
        );
    }

    #[tokio::test]
    async fn unknown_version_is_an_error() {
        let result = builder(MemoryVersionStore::new()).build(&v("ghost")).await;
        assert!(matches!(result, Err(BuildError::VersionNotFound(_))));
    }

    #[tokio::test]
    async fn parse_failures_skip_only_their_file() {
        let store = MemoryVersionStore::new();
        store
            .commit_as(
                v("abc123"),
                [
                    ("a.json", "{ not json"),
                    ("b.json", r#"{"id":"b","type":"hologram"}"#),
                    ("c.json", r#"{"id":"c","type":"page"}"#),
                ],
            )
            .unwrap();
        let cache = builder(store).build(&v("abc123")).await.unwrap();
        assert_eq!(cache.ids().collect::<Vec<_>>(), vec!["c"]);
        let failed: Vec<&str> = cache.report().parse_failures.iter().map(|e| e.path()).collect();
        assert_eq!(failed, vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn identical_duplicates_are_reused() {
        let shared = r#"{"id":"shared","type":"content","value":"same"}"#;
        let store = MemoryVersionStore::new();
        store
            .commit_as(
                v("abc123"),
                [
                    ("a.json", format!(r#"{{"id":"a","type":"page","children":[{shared}]}}"#)),
                    ("b.json", format!(r#"{{"id":"b","type":"page","children":[{shared}]}}"#)),
                ],
            )
            .unwrap();
        let b = builder(store);
        let first = b.build(&v("abc123")).await.unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(first.report().reused, 1);
        assert!(first.report().conflicts.is_empty());
        assert_eq!(first.get("shared").unwrap().canonical_source_file.as_deref(), Some("a.json"));

        let second = b.build(&v("abc123")).await.unwrap();
        assert_eq!(second.len(), first.len());
        assert!(second.nodes().zip(first.nodes()).all(|(x, y)| x == y));
    }

    #[tokio::test]
    async fn conflicting_duplicates_first_path_wins() {
        let store = MemoryVersionStore::new();
        store
            .commit_as(
                v("abc123"),
                [
                    ("z/late.json", r#"{"id":"dup","type":"page","title":"Late"}"#),
                    ("a/early.json", r#"{"id":"dup","type":"page","title":"Early"}"#),
                ],
            )
            .unwrap();
        let b = builder(store);
        for _ in 0..3 {
            let cache = b.build(&v("abc123")).await.unwrap();
            assert_eq!(cache.get("dup").unwrap().title.as_deref(), Some("Early"));
            assert_eq!(
                cache.report().conflicts,
                vec![DuplicateConflict {
                    id: "dup".to_string(),
                    kept_source: Some("a/early.json".to_string()),
                    skipped_source: "z/late.json".to_string(),
                }]
            );
        }
    }

    #[tokio::test]
    async fn same_file_duplicates_are_reused() {
        let store = MemoryVersionStore::new();
        store
            .commit_as(
                v("abc123"),
                [(
                    "page.json",
                    r#"{"id":"page","type":"page","children":[
                        {"id":"note","type":"content","value":"x"},
                        {"id":"note","type":"content","value":"x"}]}"#,
                )],
            )
            .unwrap();
        let cache = builder(store).build(&v("abc123")).await.unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.report().reused, 1);
        assert!(cache.report().conflicts.is_empty());
    }

    #[tokio::test]
    async fn published_only_prunes_subtrees() {
        let store = MemoryVersionStore::new();
        store
            .commit_as(
                v("abc123"),
                [
                    ("draft.json", r#"{"id":"draft","type":"page","published":false}"#),
                    (
                        "live.json",
                        r#"{"id":"live","type":"page","published":true,
                            "children":[{"id":"hidden","type":"content","published":false}]}"#,
                    ),
                ],
            )
            .unwrap();
        let cache = builder(store)
            .with_published_only(true)
            .build(&v("abc123"))
            .await
            .unwrap();
        assert_eq!(cache.ids().collect::<Vec<_>>(), vec!["live"]);
        assert_eq!(cache.report().unpublished, 1);
    }

    #[tokio::test]
    async fn custom_suffix() {
        let store = MemoryVersionStore::new();
        store
            .commit_as(
                v("abc123"),
                [
                    ("a.json", r#"{"id":"a","type":"page"}"#),
                    ("b.content", r#"{"id":"b","type":"page"}"#),
                ],
            )
            .unwrap();
        let cache = builder(store)
            .with_suffix(".content")
            .build(&v("abc123"))
            .await
            .unwrap();
        assert_eq!(cache.ids().collect::<Vec<_>>(), vec!["b"]);
    }
}
