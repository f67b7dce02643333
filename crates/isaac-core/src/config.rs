//! Content manager configuration
//!
//! Every field has a default, so a TOML file only needs the keys it
//! changes:
//!
//! ```toml
//! max_cached_versions = 4
//! published_only = true
//! ensure_cache_timeout_ms = 30000
//! ```

use crate::error::ContentError;
use isaac_ingest::{DEFAULT_CONTENT_SUFFIX, DEFAULT_MAX_VERSIONS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fields the free-text search matches against
pub const DEFAULT_SEARCH_FIELDS: &[&str] = &["id", "title", "tags", "value", "children"];

/// Configuration for [`ContentManager`](crate::ContentManager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Versions kept in memory before the least recently used is evicted
    pub max_cached_versions: u64,
    /// Suffix of content files in a version tree
    pub content_suffix: String,
    /// Reject files whose type tag is not registered
    pub strict_types: bool,
    /// Skip nodes explicitly marked unpublished
    pub published_only: bool,
    /// Caller deadline for `ensure_cache`, in milliseconds
    pub ensure_cache_timeout_ms: Option<u64>,
    /// Text fields used by `search_for_content`
    pub search_fields: Vec<String>,
    /// Drop a version's cache once the controller moves past it
    pub evict_superseded_versions: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            max_cached_versions: DEFAULT_MAX_VERSIONS,
            content_suffix: DEFAULT_CONTENT_SUFFIX.to_string(),
            strict_types: true,
            published_only: false,
            ensure_cache_timeout_ms: None,
            search_fields: DEFAULT_SEARCH_FIELDS.iter().map(ToString::to_string).collect(),
            evict_superseded_versions: false,
        }
    }
}

impl ContentConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns [`ContentError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(raw: &str) -> Result<Self, ContentError> {
        let config: Self = toml::from_str(raw).map_err(|e| ContentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ContentError::Config`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.max_cached_versions == 0 {
            return Err(ContentError::Config(
                "max_cached_versions must be at least 1".to_string(),
            ));
        }
        if self.content_suffix.trim().is_empty() {
            return Err(ContentError::Config("content_suffix must not be empty".to_string()));
        }
        if self.search_fields.is_empty() {
            return Err(ContentError::Config("search_fields must not be empty".to_string()));
        }
        if self.ensure_cache_timeout_ms == Some(0) {
            return Err(ContentError::Config(
                "ensure_cache_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Deadline for `ensure_cache`, if any
    #[inline]
    #[must_use]
    pub fn ensure_cache_timeout(&self) -> Option<Duration> {
        self.ensure_cache_timeout_ms.map(Duration::from_millis)
    }

    /// With cache capacity
    #[inline]
    #[must_use]
    pub fn with_max_cached_versions(mut self, max: u64) -> Self {
        self.max_cached_versions = max;
        self
    }

    /// With content file suffix
    #[inline]
    #[must_use]
    pub fn with_content_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.content_suffix = suffix.into();
        self
    }

    /// With strict type checking
    #[inline]
    #[must_use]
    pub fn with_strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    /// With unpublished content skipped
    #[inline]
    #[must_use]
    pub fn with_published_only(mut self, published_only: bool) -> Self {
        self.published_only = published_only;
        self
    }

    /// With `ensure_cache` deadline
    #[inline]
    #[must_use]
    pub fn with_ensure_cache_timeout(mut self, timeout: Duration) -> Self {
        self.ensure_cache_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// With search fields
    #[must_use]
    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// With eviction of superseded versions
    #[inline]
    #[must_use]
    pub fn with_evict_superseded_versions(mut self, evict: bool) -> Self {
        self.evict_superseded_versions = evict;
        self
    }
}
