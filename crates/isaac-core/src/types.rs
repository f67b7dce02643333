//! Shared result types

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle of one version inside a [`ContentManager`](crate::ContentManager)
///
/// Moves `Absent → CacheOnly → Ready`. A version drops back to `CacheOnly`
/// only when the search backend loses its index, and back to `Absent` only
/// through an explicit clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionState {
    /// Nothing built
    Absent,
    /// Id lookups work; search is degraded
    CacheOnly,
    /// Cache built and search index ready
    Ready,
}

impl VersionState {
    /// Whether id lookups can be served
    #[inline]
    #[must_use]
    pub fn is_cached(self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Whether searches can be served
    #[inline]
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for VersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "ABSENT",
            Self::CacheOnly => "CACHE_ONLY",
            Self::Ready => "READY",
        })
    }
}

/// One page of results plus the number of matches before paging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsWrapper<T> {
    pub results: Vec<T>,
    pub total_results: usize,
}

impl<T> ResultsWrapper<T> {
    /// Create new page
    #[inline]
    #[must_use]
    pub fn new(results: Vec<T>, total_results: usize) -> Self {
        Self {
            results,
            total_results,
        }
    }

    /// No results
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// Slice `all` into the page starting at `start`
    #[must_use]
    pub fn paginate(all: Vec<T>, start: usize, limit: Option<usize>) -> Self {
        let total = all.len();
        let results = all
            .into_iter()
            .skip(start)
            .take(limit.unwrap_or(usize::MAX))
            .collect();
        Self::new(results, total)
    }

    /// Results on this page
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether this page is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl<T> Default for ResultsWrapper<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Content problems keyed by node id or source file
pub type ProblemMap = BTreeMap<String, Vec<String>>;
