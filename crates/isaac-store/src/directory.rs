//! Directory-backed version store
//!
//! Each immediate subdirectory of the root is one version snapshot, named by
//! its version id:
//!
//! ```text
//! content/
//!   abc123/physics/page1.json
//!   abc123/physics/diagram.png
//!   def456/...
//! ```
//!
//! Recency is the directory modification time, ties broken by name.
//! Filesystem work runs on the blocking pool.

use crate::error::StoreError;
use crate::store::{TreeEntry, TreeHandle, VersionStore};
use async_trait::async_trait;
use isaac_model::{TreePath, VersionId};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Version store over snapshot directories
#[derive(Debug, Clone)]
pub struct DirectoryVersionStore {
    root: PathBuf,
}

impl DirectoryVersionStore {
    /// Create new store rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding `version`, if the id is a plain directory name
    fn version_dir(&self, version: &VersionId) -> Option<PathBuf> {
        let name = version.as_str();
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return None;
        }
        Some(self.root.join(name))
    }

    fn file_path(&self, version: &VersionId, path: &TreePath) -> Option<PathBuf> {
        let mut full = self.version_dir(version)?;
        full.extend(path.segments());
        Some(full)
    }
}

async fn is_dir(path: &Path) -> Result<bool, StoreError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(StoreError::io_error(path, err)),
    }
}

fn walk_blocking(base: &Path, suffix: &str) -> Result<Vec<TreeEntry>, StoreError> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(base).follow_links(false) {
        let entry = entry.map_err(|err| {
            let path = err.path().unwrap_or(base).to_path_buf();
            StoreError::io_error(path, err.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !name.ends_with(suffix) {
            continue;
        }
        let Some(path) = tree_path(base, entry.path()) else {
            continue;
        };
        let bytes =
            std::fs::read(entry.path()).map_err(|err| StoreError::io_error(entry.path(), err))?;
        entries.push(TreeEntry { path, bytes });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

/// Tree path of a walked file; `None` (logged) if it has no such path
fn tree_path(base: &Path, file: &Path) -> Option<TreePath> {
    let relative = file.strip_prefix(base).unwrap_or(file);
    let Some(raw) = relative.to_str() else {
        tracing::warn!("Skipping {}: file name is not UTF-8", relative.display());
        return None;
    };
    match TreePath::parse(raw) {
        Ok(path) => Some(path),
        Err(err) => {
            tracing::warn!("Skipping {}: {}", raw, err);
            None
        }
    }
}

fn list_blocking(root: &Path) -> Result<Vec<VersionId>, StoreError> {
    let read = std::fs::read_dir(root).map_err(|err| StoreError::io_error(root, err))?;
    let mut found: Vec<(SystemTime, VersionId)> = Vec::new();
    for entry in read {
        let entry = entry.map_err(|err| StoreError::io_error(root, err))?;
        let meta = entry
            .metadata()
            .map_err(|err| StoreError::io_error(entry.path(), err))?;
        if !meta.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let Ok(version) = VersionId::new(&name) else {
            continue;
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        found.push((modified, version));
    }
    found.sort_by(|a, b| b.cmp(a));
    Ok(found.into_iter().map(|(_, version)| version).collect())
}

#[async_trait]
impl VersionStore for DirectoryVersionStore {
    async fn resolve(&self, version: &VersionId) -> Result<Option<TreeHandle>, StoreError> {
        let Some(dir) = self.version_dir(version) else {
            return Ok(None);
        };
        if is_dir(&dir).await? {
            Ok(Some(TreeHandle::new(version.clone(), None)))
        } else {
            Ok(None)
        }
    }

    async fn walk(&self, tree: &TreeHandle, suffix: &str) -> Result<Vec<TreeEntry>, StoreError> {
        let base = self
            .version_dir(tree.version())
            .ok_or_else(|| StoreError::VersionNotFound(tree.version().clone()))?;
        if !is_dir(&base).await? {
            return Err(StoreError::VersionNotFound(tree.version().clone()));
        }
        let suffix = suffix.to_string();
        tracing::debug!("Walking {} for *{}", base.display(), suffix);
        tokio::task::spawn_blocking(move || walk_blocking(&base, &suffix)).await?
    }

    async fn path_exists(&self, version: &VersionId, path: &TreePath) -> Result<bool, StoreError> {
        let Some(full) = self.file_path(version, path) else {
            return Ok(false);
        };
        match tokio::fs::metadata(&full).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::io_error(full, err)),
        }
    }

    async fn read_file(
        &self,
        version: &VersionId,
        path: &TreePath,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(full) = self.file_path(version, path) else {
            return Ok(None);
        };
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io_error(full, err)),
        }
    }

    async fn list_versions(&self) -> Result<Vec<VersionId>, StoreError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || list_blocking(&root)).await?
    }
}
