//! Referential integrity checks
//!
//! A version is consistent when every `relatedContent` id resolves to a
//! cached node and every local figure source exists in the version tree.
//! Failures are a quality signal: they are logged and reported, never
//! raised.

use crate::types::ProblemMap;
use futures::future::join_all;
use isaac_ingest::VersionCache;
use isaac_model::{is_external_reference, ContentNode, TreePath, VersionId};
use isaac_store::{StoreError, VersionStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Outcome of validating one version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    /// Ids defined anywhere in the version
    pub defined_ids: usize,
    /// Referenced ids that no node defines
    pub missing_ids: BTreeSet<String>,
    /// Local figure sources absent from the tree
    pub missing_assets: BTreeSet<String>,
    /// Problems per referencing node id (or source file for anonymous nodes)
    pub problems: ProblemMap,
}

impl IntegrityReport {
    /// No missing ids and no missing assets
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.missing_ids.is_empty() && self.missing_assets.is_empty()
    }

    fn record(&mut self, owner: String, problem: String) {
        self.problems.entry(owner).or_default().push(problem);
    }
}

fn owner_of(node: &ContentNode) -> String {
    node.id()
        .or(node.canonical_source_file.as_deref())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Checks cached versions against their version tree
#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    store: Arc<dyn VersionStore>,
}

impl IntegrityValidator {
    /// Create new validator
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }

    /// Validate a built cache
    ///
    /// # Errors
    /// Returns [`StoreError`] if asset existence cannot be checked.
    pub async fn validate(&self, cache: &VersionCache) -> Result<IntegrityReport, StoreError> {
        let version = cache.version();
        let nodes: Vec<&ContentNode> = cache.nodes().flat_map(|n| n.flatten()).collect();

        let defined: BTreeSet<&str> = nodes.iter().filter_map(|n| n.id()).collect();
        let mut report = IntegrityReport {
            defined_ids: defined.len(),
            ..IntegrityReport::default()
        };

        let mut dangling: BTreeSet<(String, String)> = BTreeSet::new();
        for node in &nodes {
            for related in &node.related_content {
                if !defined.contains(related.as_str()) {
                    dangling.insert((owner_of(node), related.clone()));
                }
            }
        }
        for (owner, related) in dangling {
            report.record(owner, format!("related content id {related} does not exist"));
            report.missing_ids.insert(related);
        }

        // asset path -> referencing owner, from both cached nodes and the build
        let mut assets: BTreeMap<String, String> = cache.report().asset_refs.clone();
        for node in &nodes {
            if let Some(src) = node.asset_src().filter(|src| !is_external_reference(src)) {
                assets.insert(src.to_string(), owner_of(node));
            }
        }
        let found = join_all(assets.keys().map(|src| self.asset_exists(version, src))).await;
        for ((src, owner), exists) in assets.into_iter().zip(found) {
            if !exists? {
                report.record(owner, format!("figure source {src} not found"));
                report.missing_assets.insert(src);
            }
        }

        if report.is_valid() {
            tracing::info!(
                "Referential integrity check passed for {} ({} ids)",
                version.short(),
                report.defined_ids
            );
        } else {
            tracing::error!(
                "Referential integrity check failed for {}: missing ids {:?}, missing assets {:?}",
                version.short(),
                report.missing_ids,
                report.missing_assets
            );
        }
        Ok(report)
    }

    async fn asset_exists(&self, version: &VersionId, src: &str) -> Result<bool, StoreError> {
        match TreePath::parse(src) {
            Ok(path) => self.store.path_exists(version, &path).await,
            Err(err) => {
                tracing::warn!("Figure source {} is not a tree path: {}", src, err);
                Ok(false)
            }
        }
    }
}
