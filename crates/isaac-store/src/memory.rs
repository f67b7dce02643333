//! In-memory, content-addressed version store
//!
//! Blobs are stored once under their [`ContentHash`]; a version is a sorted
//! map of paths to blob hashes plus the Merkle root over that map. Committing
//! the same files twice yields the same version id. Versions are immutable
//! once committed.

use crate::error::StoreError;
use crate::store::{TreeEntry, TreeHandle, VersionStore};
use async_trait::async_trait;
use dashmap::DashMap;
use isaac_model::{ContentHash, TreeDigest, TreePath, VersionId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
struct Snapshot {
    files: BTreeMap<TreePath, ContentHash>,
    root: ContentHash,
}

/// Version store held entirely in memory
///
/// Used by tests and by embedders that receive content from elsewhere.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    blobs: DashMap<ContentHash, Arc<[u8]>>,
    snapshots: DashMap<VersionId, Arc<Snapshot>>,
    /// Oldest first
    history: RwLock<Vec<VersionId>>,
}

impl MemoryVersionStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a tree; the version id is the hex Merkle root of the tree
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidPath`] if a file name does not normalize.
    pub fn commit<I, P, B>(&self, files: I) -> Result<VersionId, StoreError>
    where
        I: IntoIterator<Item = (P, B)>,
        P: AsRef<str>,
        B: AsRef<[u8]>,
    {
        let snapshot = self.stage(files)?;
        let version = VersionId::from_root(&snapshot.root);
        self.publish(version.clone(), snapshot)?;
        Ok(version)
    }

    /// Commit a tree under an explicit version id
    ///
    /// Re-committing an existing id with the same tree is a no-op.
    ///
    /// # Errors
    /// - [`StoreError::InvalidPath`] if a file name does not normalize
    /// - [`StoreError::VersionExists`] if the id already names another tree
    pub fn commit_as<I, P, B>(&self, version: VersionId, files: I) -> Result<VersionId, StoreError>
    where
        I: IntoIterator<Item = (P, B)>,
        P: AsRef<str>,
        B: AsRef<[u8]>,
    {
        let snapshot = self.stage(files)?;
        self.publish(version.clone(), snapshot)?;
        Ok(version)
    }

    /// Forget a version; blobs shared with other versions are kept
    pub fn remove_version(&self, version: &VersionId) -> bool {
        self.history.write().retain(|v| v != version);
        self.snapshots.remove(version).is_some()
    }

    /// Number of distinct blobs held
    #[inline]
    #[must_use]
    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    fn stage<I, P, B>(&self, files: I) -> Result<Snapshot, StoreError>
    where
        I: IntoIterator<Item = (P, B)>,
        P: AsRef<str>,
        B: AsRef<[u8]>,
    {
        let mut tree = BTreeMap::new();
        for (path, bytes) in files {
            let path = TreePath::parse(path.as_ref())?;
            let bytes = bytes.as_ref();
            let hash = ContentHash::compute(bytes);
            self.blobs.entry(hash).or_insert_with(|| Arc::from(bytes));
            tree.insert(path, hash);
        }
        let root = TreeDigest::from_entries(tree.iter()).root();
        Ok(Snapshot { files: tree, root })
    }

    fn publish(&self, version: VersionId, snapshot: Snapshot) -> Result<(), StoreError> {
        let mut history = self.history.write();
        if let Some(existing) = self.snapshot(&version) {
            return if existing.root == snapshot.root {
                Ok(())
            } else {
                Err(StoreError::VersionExists(version))
            };
        }
        tracing::debug!(
            "Committed version {} ({} files, root {})",
            version.short(),
            snapshot.files.len(),
            snapshot.root.short()
        );
        history.push(version.clone());
        self.snapshots.insert(version, Arc::new(snapshot));
        Ok(())
    }

    fn snapshot(&self, version: &VersionId) -> Option<Arc<Snapshot>> {
        self.snapshots.get(version).map(|s| Arc::clone(s.value()))
    }

    fn blob(&self, hash: &ContentHash) -> Result<Arc<[u8]>, StoreError> {
        self.blobs
            .get(hash)
            .map(|b| Arc::clone(b.value()))
            .ok_or(StoreError::MissingBlob(*hash))
    }
}

#[async_trait]
impl VersionStore for MemoryVersionStore {
    async fn resolve(&self, version: &VersionId) -> Result<Option<TreeHandle>, StoreError> {
        Ok(self
            .snapshot(version)
            .map(|s| TreeHandle::new(version.clone(), Some(s.root))))
    }

    async fn walk(&self, tree: &TreeHandle, suffix: &str) -> Result<Vec<TreeEntry>, StoreError> {
        let snapshot = self
            .snapshot(tree.version())
            .ok_or_else(|| StoreError::VersionNotFound(tree.version().clone()))?;

        snapshot
            .files
            .iter()
            .filter(|(path, _)| path.has_suffix(suffix))
            .map(|(path, hash)| {
                Ok(TreeEntry {
                    path: path.clone(),
                    bytes: self.blob(hash)?.to_vec(),
                })
            })
            .collect()
    }

    async fn path_exists(&self, version: &VersionId, path: &TreePath) -> Result<bool, StoreError> {
        Ok(self
            .snapshot(version)
            .is_some_and(|s| s.files.contains_key(path)))
    }

    async fn read_file(
        &self,
        version: &VersionId,
        path: &TreePath,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(snapshot) = self.snapshot(version) else {
            return Ok(None);
        };
        match snapshot.files.get(path) {
            Some(hash) => Ok(Some(self.blob(hash)?.to_vec())),
            None => Ok(None),
        }
    }

    async fn list_versions(&self) -> Result<Vec<VersionId>, StoreError> {
        Ok(self.history.read().iter().rev().cloned().collect())
    }
}
