//! Paths inside a version tree
//!
//! Provides [`TreePath`], a normalized `/`-separated location of a file within
//! one version of the content repository.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Normalized path of a file inside a version tree
///
/// Always relative to the tree root, never contains `.`, `..` or empty
/// segments. Ordering is segment-wise lexicographic, which is the order
/// every tree walk in this workspace uses.
///
/// # Examples
/// - `"physics/forces/page.json"` → `["physics", "forces", "page.json"]`
/// - `"./a//b/../c.png"` → `["a", "c.png"]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreePath(Vec<String>);

impl TreePath {
    /// Parse and normalize a path
    ///
    /// A leading `/` is accepted and means the tree root.
    ///
    /// # Errors
    /// - [`PathError::Empty`] if nothing remains after normalization
    /// - [`PathError::EscapesRoot`] if `..` climbs above the tree root
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = normalize(Vec::new(), raw)?;
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(segments))
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// File name (last segment)
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Directory segments containing this file
    #[inline]
    #[must_use]
    pub fn directory(&self) -> &[String] {
        &self.0[..self.0.len().saturating_sub(1)]
    }

    /// Check the file name suffix, e.g. `".json"`
    #[inline]
    #[must_use]
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.file_name().ends_with(suffix)
    }

    /// Resolve a reference written inside this file
    ///
    /// Relative references are resolved against this file's directory,
    /// references starting with `/` against the tree root.
    ///
    /// # Errors
    /// Same as [`TreePath::parse`].
    pub fn resolve_sibling(&self, reference: &str) -> Result<Self, PathError> {
        let base = if reference.starts_with('/') {
            Vec::new()
        } else {
            self.directory().to_vec()
        };
        let segments = normalize(base, reference)?;
        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self(segments))
    }
}

fn normalize(mut segments: Vec<String>, raw: &str) -> Result<Vec<String>, PathError> {
    for part in raw.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::EscapesRoot(raw.to_string()));
                }
            }
            other => segments.push(other.to_string()),
        }
    }
    Ok(segments)
}

/// True for references that point outside the repository (`http://`, `https://`, ...)
#[must_use]
pub fn is_external_reference(reference: &str) -> bool {
    reference.starts_with("http") || reference.contains("://")
}

impl Display for TreePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl FromStr for TreePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for TreePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TreePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Errors from path parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Nothing left after normalization
    #[error("empty path")]
    Empty,

    /// `..` climbs above the tree root
    #[error("path escapes the tree root: {0}")]
    EscapesRoot(String),
}
