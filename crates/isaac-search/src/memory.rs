//! In-memory search backend
//!
//! One [`VersionIndex`] per version holds the stored documents plus an
//! inverted index per text field and a term index per exact-match field.
//! Scoring is deliberately simple: an exact token hit scores 2, a prefix hit
//! 1.5 and a one-edit typo 1, summed over query tokens and fields.

use crate::backend::SearchBackend;
use crate::document::{IndexDocument, SearchHit};
use crate::error::SearchError;
use crate::tokenizer::{normalize_term, tokenize, tokenize_unique, within_edits};
use async_trait::async_trait;
use dashmap::DashMap;
use isaac_model::VersionId;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const EXACT_SCORE: f32 = 2.0;
const PREFIX_SCORE: f32 = 1.5;
const TYPO_SCORE: f32 = 1.0;
const MIN_TYPO_LEN: usize = 4;

type DocKey = (String, String);

#[derive(Debug, Default)]
struct Postings {
    /// field -> token -> documents
    text: HashMap<String, HashMap<String, BTreeSet<DocKey>>>,
    /// field -> term -> documents
    terms: HashMap<String, HashMap<String, BTreeSet<DocKey>>>,
}

/// Index of one version
#[derive(Debug, Default)]
struct VersionIndex {
    documents: RwLock<BTreeMap<DocKey, IndexDocument>>,
    postings: RwLock<Postings>,
    ready: AtomicBool,
}

impl VersionIndex {
    fn insert(&self, doc_type: &str, document: IndexDocument) {
        let key = (doc_type.to_string(), document.id.clone());
        let mut postings = self.postings.write();
        let mut documents = self.documents.write();
        if let Some(previous) = documents.remove(&key) {
            postings.remove(&key, &previous);
        }
        postings.add(&key, &document);
        documents.insert(key, document);
    }

    fn hits<'a, I>(&self, keys: I, scores: Option<&HashMap<DocKey, f32>>) -> Vec<SearchHit>
    where
        I: IntoIterator<Item = &'a DocKey>,
    {
        let documents = self.documents.read();
        let mut hits: Vec<SearchHit> = keys
            .into_iter()
            .filter_map(|key| {
                documents.get(key).map(|doc| SearchHit {
                    id: doc.id.clone(),
                    score: scores.and_then(|s| s.get(key)).copied().unwrap_or(1.0),
                    source: doc.source.clone(),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits
    }
}

impl Postings {
    fn add(&mut self, key: &DocKey, document: &IndexDocument) {
        for (field, text) in &document.text_fields {
            let field_index = self.text.entry(field.clone()).or_default();
            for token in tokenize_unique(text) {
                field_index.entry(token).or_default().insert(key.clone());
            }
        }
        for (field, values) in &document.term_fields {
            let field_index = self.terms.entry(field.clone()).or_default();
            for value in values {
                field_index
                    .entry(normalize_term(value))
                    .or_default()
                    .insert(key.clone());
            }
        }
    }

    fn remove(&mut self, key: &DocKey, document: &IndexDocument) {
        for (field, text) in &document.text_fields {
            if let Some(field_index) = self.text.get_mut(field) {
                for token in tokenize(text) {
                    if let Some(keys) = field_index.get_mut(&token) {
                        keys.remove(key);
                    }
                }
            }
        }
        for (field, values) in &document.term_fields {
            if let Some(field_index) = self.terms.get_mut(field) {
                for value in values {
                    if let Some(keys) = field_index.get_mut(&normalize_term(value)) {
                        keys.remove(key);
                    }
                }
            }
        }
    }

    fn term_matches(&self, doc_type: &str, field: &str, values: &[String]) -> BTreeSet<DocKey> {
        let Some(field_index) = self.terms.get(field) else {
            return BTreeSet::new();
        };
        values
            .iter()
            .filter_map(|value| field_index.get(&normalize_term(value)))
            .flatten()
            .filter(|(ty, _)| ty == doc_type)
            .cloned()
            .collect()
    }
}

fn token_score(query: &str, token: &str) -> f32 {
    if token == query {
        EXACT_SCORE
    } else if token.starts_with(query) {
        PREFIX_SCORE
    } else if query.chars().count() >= MIN_TYPO_LEN && within_edits(query, token, 1) {
        TYPO_SCORE
    } else {
        0.0
    }
}

/// Search backend held in process memory
///
/// Versions are independent; indexing one never blocks queries on another.
/// [`MemorySearchBackend::set_available`] simulates an outage for tests.
#[derive(Debug)]
pub struct MemorySearchBackend {
    indices: DashMap<VersionId, Arc<VersionIndex>>,
    available: AtomicBool,
    indexed: AtomicUsize,
}

impl Default for MemorySearchBackend {
    fn default() -> Self {
        Self {
            indices: DashMap::new(),
            available: AtomicBool::new(true),
            indexed: AtomicUsize::new(0),
        }
    }
}

impl MemorySearchBackend {
    /// Create empty backend
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle availability; while unavailable every call fails
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Total documents accepted since creation, across versions
    #[must_use]
    pub fn documents_indexed(&self) -> usize {
        self.indexed.load(Ordering::SeqCst)
    }

    /// Number of documents held for a version
    #[must_use]
    pub fn document_count(&self, version: &VersionId) -> usize {
        self.indices
            .get(version)
            .map_or(0, |index| index.documents.read().len())
    }

    fn check_available(&self) -> Result<(), SearchError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SearchError::Unavailable("memory backend switched off".to_string()))
        }
    }

    fn index(&self, version: &VersionId) -> Result<Arc<VersionIndex>, SearchError> {
        self.indices
            .get(version)
            .map(|index| Arc::clone(index.value()))
            .ok_or_else(|| SearchError::MissingIndex(version.clone()))
    }
}

#[async_trait]
impl SearchBackend for MemorySearchBackend {
    async fn has_index(&self, version: &VersionId) -> Result<bool, SearchError> {
        self.check_available()?;
        Ok(self
            .indices
            .get(version)
            .is_some_and(|index| index.ready.load(Ordering::SeqCst)))
    }

    async fn index_document(
        &self,
        version: &VersionId,
        doc_type: &str,
        document: IndexDocument,
    ) -> Result<(), SearchError> {
        self.check_available()?;
        if document.id.is_empty() {
            return Err(SearchError::rejected("", "document id must not be empty"));
        }
        let index = Arc::clone(self.indices.entry(version.clone()).or_default().value());
        index.insert(doc_type, document);
        self.indexed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn mark_ready(&self, version: &VersionId) -> Result<(), SearchError> {
        self.check_available()?;
        let index = Arc::clone(self.indices.entry(version.clone()).or_default().value());
        index.ready.store(true, Ordering::SeqCst);
        tracing::debug!("Search index ready for {}", version.short());
        Ok(())
    }

    async fn fuzzy_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        query: &str,
        fields: &[String],
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.check_available()?;
        let index = self.index(version)?;
        let query_tokens = tokenize_unique(query);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores: HashMap<DocKey, f32> = HashMap::new();
        {
            let postings = index.postings.read();
            for field in fields {
                let Some(field_index) = postings.text.get(field) else {
                    continue;
                };
                for query_token in &query_tokens {
                    // best score per document for this token within the field
                    let mut best: HashMap<&DocKey, f32> = HashMap::new();
                    for (token, keys) in field_index {
                        let score = token_score(query_token, token);
                        if score == 0.0 {
                            continue;
                        }
                        for key in keys.iter().filter(|(ty, _)| ty == doc_type) {
                            let slot = best.entry(key).or_insert(0.0);
                            *slot = slot.max(score);
                        }
                    }
                    for (key, score) in best {
                        *scores.entry(key.clone()).or_insert(0.0) += score;
                    }
                }
            }
        }

        Ok(index.hits(scores.keys(), Some(&scores)))
    }

    async fn term_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        terms: &[String],
        field: &str,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.check_available()?;
        let index = self.index(version)?;
        let keys = index.postings.read().term_matches(doc_type, field, terms);
        Ok(index.hits(&keys, None))
    }

    async fn field_search(
        &self,
        version: &VersionId,
        doc_type: &str,
        fields: &BTreeMap<String, Vec<String>>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        self.check_available()?;
        if fields.is_empty() {
            return Err(SearchError::InvalidQuery("no fields to match".to_string()));
        }
        let index = self.index(version)?;
        let keys = {
            let postings = index.postings.read();
            let mut matched: Option<BTreeSet<DocKey>> = None;
            for (field, values) in fields {
                let found = postings.term_matches(doc_type, field, values);
                matched = Some(match matched {
                    None => found,
                    Some(acc) => acc.intersection(&found).cloned().collect(),
                });
            }
            matched.unwrap_or_default()
        };
        Ok(index.hits(&keys, None))
    }

    async fn drop_index(&self, version: &VersionId) -> Result<(), SearchError> {
        self.check_available()?;
        self.indices.remove(version);
        Ok(())
    }

    async fn drop_all(&self) -> Result<(), SearchError> {
        self.check_available()?;
        self.indices.clear();
        Ok(())
    }
}
