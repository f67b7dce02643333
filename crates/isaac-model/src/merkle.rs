//! Merkle digest of a version tree
//!
//! [`TreeDigest`] is a thin wrapper around `rs_merkle` that hashes an
//! ordered listing of `(path, blob hash)` pairs into one root. Two trees with
//! the same files at the same paths always share a root, so the root doubles
//! as a content-derived commit id.

use crate::hash::ContentHash;
use crate::path::TreePath;
use rs_merkle::{Hasher, MerkleTree};

/// Merkle digest over the files of one tree
pub struct TreeDigest {
    inner: MerkleTree<Blake3Hasher>,
}

impl std::fmt::Debug for TreeDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeDigest")
            .field("files", &self.inner.leaves_len())
            .field("root", &self.root().short())
            .finish()
    }
}

impl TreeDigest {
    /// Build from `(path, blob hash)` pairs
    ///
    /// Input order does not matter; entries are sorted by path first.
    #[must_use]
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a TreePath, &'a ContentHash)>,
    {
        let mut entries: Vec<_> = entries.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let leaves: Vec<[u8; 32]> = entries
            .iter()
            .map(|(path, blob)| leaf_hash(path, blob))
            .collect();

        Self {
            inner: MerkleTree::from_leaves(&leaves),
        }
    }

    /// Root hash; zero for an empty tree
    #[must_use]
    pub fn root(&self) -> ContentHash {
        self.inner.root().map(ContentHash::new).unwrap_or_default()
    }
}

fn leaf_hash(path: &TreePath, blob: &ContentHash) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(path.to_string().as_bytes());
    hasher.update(&[0]);
    hasher.update(blob.as_bytes());
    *hasher.finalize().as_bytes()
}

#[derive(Debug, Clone, Copy)]
struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    type Hash = [u8; 32];

    #[inline]
    fn hash(data: &[u8]) -> Self::Hash {
        *blake3::hash(data).as_bytes()
    }
}
