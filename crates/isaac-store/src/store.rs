//! The version store contract

use crate::error::StoreError;
use async_trait::async_trait;
use isaac_model::{ContentHash, TreePath, VersionId};
use std::fmt::Debug;
use std::sync::Arc;

/// A resolved version tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeHandle {
    version: VersionId,
    root: Option<ContentHash>,
}

impl TreeHandle {
    /// Create new handle
    #[inline]
    #[must_use]
    pub fn new(version: VersionId, root: Option<ContentHash>) -> Self {
        Self { version, root }
    }

    /// Version this tree belongs to
    #[inline]
    #[must_use]
    pub fn version(&self) -> &VersionId {
        &self.version
    }

    /// Merkle root, for stores that track one
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&ContentHash> {
        self.root.as_ref()
    }
}

/// One file produced by a tree walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: TreePath,
    pub bytes: Vec<u8>,
}

/// Immutable, versioned repository of content files
///
/// Every version is a read-only snapshot. Implementations must be cheap to
/// share across tasks; all methods take `&self`.
#[async_trait]
pub trait VersionStore: Send + Sync + Debug {
    /// Resolve a version to its tree; `None` if the store does not know it
    async fn resolve(&self, version: &VersionId) -> Result<Option<TreeHandle>, StoreError>;

    /// Every file under the tree whose name ends with `suffix`
    ///
    /// Entries are returned in [`TreePath`] order so repeated walks of one
    /// tree always agree.
    async fn walk(&self, tree: &TreeHandle, suffix: &str) -> Result<Vec<TreeEntry>, StoreError>;

    /// Whether `path` is a file at `version`
    async fn path_exists(&self, version: &VersionId, path: &TreePath) -> Result<bool, StoreError>;

    /// Raw bytes of one file
    async fn read_file(
        &self,
        version: &VersionId,
        path: &TreePath,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Known versions, newest first
    async fn list_versions(&self) -> Result<Vec<VersionId>, StoreError>;

    /// Newest version
    async fn latest_version(&self) -> Result<Option<VersionId>, StoreError> {
        Ok(self.list_versions().await?.into_iter().next())
    }
}

#[async_trait]
impl<T: VersionStore + ?Sized> VersionStore for Arc<T> {
    async fn resolve(&self, version: &VersionId) -> Result<Option<TreeHandle>, StoreError> {
        (**self).resolve(version).await
    }

    async fn walk(&self, tree: &TreeHandle, suffix: &str) -> Result<Vec<TreeEntry>, StoreError> {
        (**self).walk(tree, suffix).await
    }

    async fn path_exists(&self, version: &VersionId, path: &TreePath) -> Result<bool, StoreError> {
        (**self).path_exists(version, path).await
    }

    async fn read_file(
        &self,
        version: &VersionId,
        path: &TreePath,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read_file(version, path).await
    }

    async fn list_versions(&self) -> Result<Vec<VersionId>, StoreError> {
        (**self).list_versions().await
    }

    async fn latest_version(&self) -> Result<Option<VersionId>, StoreError> {
        (**self).latest_version().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryVersionStore;

    #[test]
    fn handle_accessors() {
        let version = VersionId::new("abc123").unwrap();
        let handle = TreeHandle::new(version.clone(), None);
        assert_eq!(handle.version(), &version);
        assert!(handle.root().is_none());
    }

    #[tokio::test]
    async fn arc_delegates_and_latest_defaults_to_head() {
        let store = Arc::new(MemoryVersionStore::new());
        let first = store.commit([("a.json", "{}")]).unwrap();
        let second = store.commit([("a.json", "[]")]).unwrap();

        let shared: Arc<dyn VersionStore> = store;
        assert_eq!(shared.latest_version().await.unwrap(), Some(second.clone()));
        assert_eq!(shared.list_versions().await.unwrap(), vec![second, first]);
    }
}
