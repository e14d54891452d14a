//! Ingestion pipeline orchestration: extract → chunk → embed → persist.
//!
//! The service distinguishes "could not produce any text" (a validation
//! error the caller can correct) from internal decoder faults, which the
//! extraction layer has already downgraded to empty text. Persistence is a
//! single atomic append: a document is never observable without all of its
//! chunks.

use std::sync::Arc;

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::extract;
use crate::models::{Document, NewChunk, NewDocument};
use crate::store::DocumentStore;

/// An upload to ingest: raw bytes plus what the caller declared about them.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

pub struct IngestionService {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    overlap: usize,
    embed_chunks: bool,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunking: &ChunkingConfig,
        embed_chunks: bool,
    ) -> Self {
        Self {
            store,
            embedder,
            chunk_size: chunking.chunk_size,
            overlap: chunking.overlap,
            embed_chunks,
        }
    }

    /// Ingest one upload and return the persisted document.
    ///
    /// Title and source default to the filename when absent. Fails with a
    /// validation error when extraction and normalization yield no chunks;
    /// nothing is persisted in that case.
    pub async fn ingest(&self, request: IngestRequest) -> Result<Document> {
        let text = extract::extract_text(
            &request.bytes,
            request.content_type.as_deref(),
            &request.filename,
        );

        let pieces = chunk_text(&text, self.chunk_size, self.overlap);
        if pieces.is_empty() {
            return Err(Error::validation("document has no readable text"));
        }

        // embeddings[i] belongs to pieces[i]; the zip below preserves that.
        let embeddings = if self.embed_chunks {
            Some(self.embedder.embed(&pieces).await?)
        } else {
            None
        };

        let chunks: Vec<NewChunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| NewChunk {
                content,
                embedding: embeddings.as_ref().and_then(|e| e.get(i).cloned()),
            })
            .collect();

        let title = request
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| request.filename.clone());
        let source = request.source.or_else(|| Some(request.filename.clone()));

        let document = self
            .store
            .append_document(
                NewDocument {
                    title,
                    source,
                    metadata: request.metadata,
                },
                chunks,
            )
            .await?;

        tracing::info!(
            document_id = %document.id,
            chunks = document.chunks.len(),
            "ingested document"
        );
        Ok(document)
    }
}
