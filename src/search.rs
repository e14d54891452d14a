//! Keyword and vector retrieval over stored chunks.
//!
//! The keyword side has two ranking paths on purpose: token-set scoring
//! for queries that yield tokens of three or more characters, and a single
//! substring-containment pass for short queries where no token survives.
//! Short and acronym queries rely on the containment pass, so the paths
//! are not unified.
//!
//! Vector retrieval degrades gracefully: when the store does not advertise
//! a distance capability, [`SearchEngine::search_by_vector`] transparently
//! answers with keyword results instead of erroring.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::models::{Chunk, SearchMatch};
use crate::store::DocumentStore;

pub struct SearchEngine {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    /// Keyword retrieval: rank candidate chunks by how many distinct query
    /// tokens they contain, ties broken by ascending chunk index.
    ///
    /// An empty query yields an empty result, not an error.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchMatch>> {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let tokens = tokenize(&normalized);
        let needles: Vec<String> = if tokens.is_empty() {
            // No token survived (short query): fall back to matching the
            // full query as a substring. Scores are 0 on this path and
            // ranking rests on the chunk-index tie-break.
            vec![normalized]
        } else {
            tokens.clone()
        };

        let candidates = self.store.chunks_matching_any(&needles).await?;

        let mut scored: Vec<(usize, Chunk)> = candidates
            .into_iter()
            .map(|chunk| {
                let content = chunk.content.to_lowercase();
                let score = tokens
                    .iter()
                    .filter(|token| content.contains(token.as_str()))
                    .count();
                (score, chunk)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then(a.1.chunk_index.cmp(&b.1.chunk_index))
                .then(a.1.document_id.cmp(&b.1.document_id))
        });
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, c)| to_match(c)).collect())
    }

    /// Vector retrieval: embed the query and return the nearest stored
    /// chunks by ascending distance. Falls back to [`SearchEngine::search`]
    /// when the store lacks the capability.
    pub async fn search_by_vector(&self, query: &str, limit: usize) -> Result<Vec<SearchMatch>> {
        if !self.store.supports_vector_search() {
            return self.search(query, limit).await;
        }

        let query_vec = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::upstream(anyhow::anyhow!("empty embedding response")))?;

        let chunks = self.store.nearest_chunks(&query_vec, limit).await?;
        Ok(chunks.into_iter().map(to_match).collect())
    }
}

fn to_match(chunk: Chunk) -> SearchMatch {
    SearchMatch {
        document_id: chunk.document_id,
        chunk_index: chunk.chunk_index,
        content: chunk.content,
    }
}

/// Tokens split on non-word-character boundaries, keeping those with at
/// least three characters, deduplicated in first-seen order. The input is
/// expected to be lower-cased already.
fn tokenize(query: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in query.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if token.chars().count() >= 3 && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_short_tokens() {
        assert_eq!(tokenize("an ai query"), vec!["query"]);
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(
            tokenize("hello, world! hello?"),
            vec!["hello", "world"]
        );
    }

    #[test]
    fn tokenize_keeps_underscores_inside_tokens() {
        assert_eq!(tokenize("chunk_index field"), vec!["chunk_index", "field"]);
    }

    #[test]
    fn tokenize_of_short_only_query_is_empty() {
        assert!(tokenize("a to of").is_empty());
    }

    #[test]
    fn tokenize_counts_chars_not_bytes() {
        // Two chars, four bytes: still below the three-char floor.
        assert!(tokenize("éé").is_empty());
        assert_eq!(tokenize("ééé"), vec!["ééé"]);
    }
}
