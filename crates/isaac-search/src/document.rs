//! Documents submitted to and returned from a search backend

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One document to index
///
/// `source` is the stored JSON returned verbatim on a hit. Text fields are
/// tokenized for fuzzy search; term fields are matched exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub text_fields: BTreeMap<String, String>,
    #[serde(default)]
    pub term_fields: BTreeMap<String, BTreeSet<String>>,
}

impl IndexDocument {
    /// Create new document
    #[must_use]
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            text_fields: BTreeMap::new(),
            term_fields: BTreeMap::new(),
        }
    }

    /// With a free-text field; empty text is skipped
    #[must_use]
    pub fn with_text(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.text_fields.insert(field.into(), text);
        }
        self
    }

    /// With exact-match terms for a field; merged with existing terms
    #[must_use]
    pub fn with_terms<I, T>(mut self, field: impl Into<String>, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let entry = self.term_fields.entry(field.into()).or_default();
        entry.extend(terms.into_iter().map(Into::into));
        self
    }
}

/// A search match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    /// Stored JSON of the matched document
    pub source: String,
}
