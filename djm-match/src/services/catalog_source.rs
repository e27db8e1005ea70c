//! In-memory catalog candidate source
//!
//! Answers queries from a fixed list of catalog entries, typically loaded from
//! a JSON export. An entry matches when every query word appears among the
//! words of its title and artists; matches come back in catalog order.

use super::text_normalizer::word_tokens;
use crate::types::{CandidateRaw, CandidateSource, FetchError, SearchQuery};
use async_trait::async_trait;
use djm_common::config::load_json_file;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone)]
struct IndexedEntry {
    candidate: CandidateRaw,
    words: HashSet<String>,
}

/// [`CandidateSource`] over an in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct CatalogSource {
    entries: Vec<IndexedEntry>,
}

impl CatalogSource {
    pub fn new(catalog: Vec<CandidateRaw>) -> Self {
        let entries = catalog
            .into_iter()
            .map(|candidate| {
                let words = word_tokens(&candidate.title)
                    .into_iter()
                    .chain(word_tokens(&candidate.artists))
                    .collect();
                IndexedEntry { candidate, words }
            })
            .collect();
        Self { entries }
    }

    /// Load a catalog from a JSON array of candidate records
    pub fn from_json_file(path: &Path) -> djm_common::Result<Self> {
        let catalog: Vec<CandidateRaw> = load_json_file(path)?;
        tracing::info!(path = %path.display(), entries = catalog.len(), "Loaded catalog");
        Ok(Self::new(catalog))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CandidateSource for CatalogSource {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn fetch(&self, query: &SearchQuery, limit: usize) -> Result<Vec<CandidateRaw>, FetchError> {
        let wanted = word_tokens(&query.text);
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .entries
            .iter()
            .filter(|entry| wanted.iter().all(|w| entry.words.contains(w)))
            .take(limit)
            .map(|entry| entry.candidate.clone())
            .collect())
    }
}
