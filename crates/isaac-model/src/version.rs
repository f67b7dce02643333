//! Content version identifiers

use crate::hash::ContentHash;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Opaque identifier of an immutable content snapshot (e.g. a commit hash)
///
/// Versions carry no ordering of their own; recency is answered by the
/// version store's history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Create a version id
    ///
    /// # Errors
    /// Returns [`VersionError::Empty`] for blank input.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, VersionError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Version id named after a tree's Merkle root
    #[must_use]
    pub fn from_root(root: &ContentHash) -> Self {
        Self(root.to_string())
    }

    /// Raw identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines
    #[must_use]
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl Display for VersionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VersionId {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> serde::Deserialize<'de> for VersionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// Which version a caller is asking for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum VersionSelector {
    /// Whatever the store reports as newest when the request runs
    #[default]
    Latest,

    /// One specific snapshot
    Pinned(VersionId),
}

impl VersionSelector {
    /// Pinned version, if any
    #[inline]
    #[must_use]
    pub fn pinned(&self) -> Option<&VersionId> {
        match self {
            Self::Latest => None,
            Self::Pinned(version) => Some(version),
        }
    }
}

impl From<VersionId> for VersionSelector {
    fn from(version: VersionId) -> Self {
        Self::Pinned(version)
    }
}

impl From<Option<VersionId>> for VersionSelector {
    fn from(version: Option<VersionId>) -> Self {
        version.map_or(Self::Latest, Self::Pinned)
    }
}

impl Display for VersionSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Pinned(version) => Display::fmt(version, f),
        }
    }
}

/// Version id errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Blank identifier
    #[error("version id must not be empty")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_id_trims_and_rejects_blank() {
        assert_eq!(VersionId::new("  abc123 ").unwrap().as_str(), "abc123");
        assert_eq!(VersionId::new("   "), Err(VersionError::Empty));
    }

    #[test]
    fn from_root_is_hex() {
        let root = ContentHash::compute(b"tree");
        let v = VersionId::from_root(&root);
        assert_eq!(v.as_str().len(), 64);
        assert_eq!(v.short(), &root.short()[..8]);
    }

    #[test]
    fn short_form() {
        let v: VersionId = "0123456789abcdef".parse().unwrap();
        assert_eq!(v.short(), "01234567");
        let v: VersionId = "abc".parse().unwrap();
        assert_eq!(v.short(), "abc");
    }

    #[test]
    fn selector_conversions() {
        let v: VersionId = "abc123".parse().unwrap();
        assert_eq!(VersionSelector::from(Some(v.clone())).pinned(), Some(&v));
        assert_eq!(VersionSelector::from(None), VersionSelector::Latest);
        assert_eq!(VersionSelector::Latest.to_string(), "latest");
    }

    #[test]
    fn serde_is_transparent() {
        let v: VersionId = "abc123".parse().unwrap();
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"abc123\"");
        assert!(serde_json::from_str::<VersionId>("\"\"").is_err());
    }
}
