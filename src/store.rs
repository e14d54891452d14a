//! Narrow persistence contract and its SQLite implementation.
//!
//! [`DocumentStore`] is the only surface the pipeline uses to touch
//! storage: append a document with its chunks, list, delete, fetch chunk
//! candidates by containment, and (optionally) nearest-neighbor lookup
//! over stored embeddings. The vector capability is *advertised* via
//! [`DocumentStore::supports_vector_search`], not discovered by catching
//! errors, so the search engine can branch on it and fall back to keyword
//! retrieval without ever observing a failure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, l2_distance, vec_to_blob};
use crate::error::{Error, Result};
use crate::models::{Chunk, Document, NewChunk, NewDocument};

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Atomically persist a document and its chunks. Chunk indices are
    /// assigned from slice order, so they are contiguous from 0 by
    /// construction. Partial writes are never observable.
    async fn append_document(&self, doc: NewDocument, chunks: Vec<NewChunk>) -> Result<Document>;

    /// List all documents, oldest first, each with its chunks in index order.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Delete a document and all of its chunks. Returns `false` when the
    /// id is unknown.
    async fn delete_document(&self, id: Uuid) -> Result<bool>;

    /// Fetch chunks whose lower-cased content contains at least one of the
    /// given needles, ordered by ascending chunk index.
    async fn chunks_matching_any(&self, needles: &[String]) -> Result<Vec<Chunk>>;

    /// Whether [`nearest_chunks`](DocumentStore::nearest_chunks) is usable
    /// on this backend.
    fn supports_vector_search(&self) -> bool {
        false
    }

    /// The `limit` chunks with embeddings closest (ascending L2 distance)
    /// to the given vector. Chunks without an embedding never match.
    async fn nearest_chunks(&self, embedding: &[f32], limit: usize) -> Result<Vec<Chunk>>;
}

/// SQLite-backed store.
///
/// Nearest-neighbor lookup is a brute-force scan over stored embedding
/// BLOBs with the distance computed in Rust; the capability is advertised
/// only when embeddings are being written at all.
pub struct SqliteStore {
    pool: SqlitePool,
    vector_capable: bool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, vector_capable: bool) -> Self {
        Self {
            pool,
            vector_capable,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn append_document(&self, doc: NewDocument, chunks: Vec<NewChunk>) -> Result<Document> {
        let doc_id = Uuid::new_v4();
        let created_at = Utc::now();
        let metadata_json = doc
            .metadata
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "{}".to_string());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO documents (id, title, source, metadata_json, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(doc_id.to_string())
        .bind(&doc.title)
        .bind(&doc.source)
        .bind(&metadata_json)
        .bind(created_at.timestamp())
        .execute(&mut *tx)
        .await?;

        let mut stored = Vec::with_capacity(chunks.len());
        for (idx, chunk) in chunks.into_iter().enumerate() {
            let chunk_id = Uuid::new_v4();
            let blob = chunk.embedding.as_deref().map(vec_to_blob);

            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, content, embedding) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(chunk_id.to_string())
            .bind(doc_id.to_string())
            .bind(idx as i64)
            .bind(&chunk.content)
            .bind(&blob)
            .execute(&mut *tx)
            .await?;

            stored.push(Chunk {
                id: chunk_id,
                document_id: doc_id,
                chunk_index: idx as i64,
                content: chunk.content,
                embedding: chunk.embedding,
            });
        }

        tx.commit().await?;

        Ok(Document {
            id: doc_id,
            title: doc.title,
            source: doc.source,
            metadata: doc.metadata,
            // Second precision matches what a re-read from SQLite returns.
            created_at: DateTime::from_timestamp(created_at.timestamp(), 0).unwrap_or(created_at),
            chunks: stored,
        })
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let doc_rows = sqlx::query(
            "SELECT id, title, source, metadata_json, created_at FROM documents ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let chunk_rows = sqlx::query(
            "SELECT id, document_id, chunk_index, content, embedding FROM chunks ORDER BY document_id ASC, chunk_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut chunks_by_doc: std::collections::HashMap<Uuid, Vec<Chunk>> =
            std::collections::HashMap::new();
        for row in &chunk_rows {
            let chunk = hydrate_chunk(row)?;
            chunks_by_doc
                .entry(chunk.document_id)
                .or_default()
                .push(chunk);
        }

        let mut documents = Vec::with_capacity(doc_rows.len());
        for row in &doc_rows {
            let id = parse_uuid(row.get("id"))?;
            let metadata_json: String = row.get("metadata_json");
            let created_at: i64 = row.get("created_at");
            documents.push(Document {
                id,
                title: row.get("title"),
                source: row.get("source"),
                metadata: serde_json::from_str(&metadata_json).ok(),
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_else(Utc::now),
                chunks: chunks_by_doc.remove(&id).unwrap_or_default(),
            });
        }

        Ok(documents)
    }

    async fn delete_document(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn chunks_matching_any(&self, needles: &[String]) -> Result<Vec<Chunk>> {
        if needles.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from(
            "SELECT id, document_id, chunk_index, content, embedding FROM chunks WHERE ",
        );
        let clauses: Vec<&str> = needles
            .iter()
            .map(|_| "lower(content) LIKE ? ESCAPE '\\'")
            .collect();
        sql.push_str(&clauses.join(" OR "));
        sql.push_str(" ORDER BY chunk_index ASC, document_id ASC");

        let mut query = sqlx::query(&sql);
        for needle in needles {
            query = query.bind(format!("%{}%", escape_like(&needle.to_lowercase())));
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(hydrate_chunk).collect()
    }

    fn supports_vector_search(&self) -> bool {
        self.vector_capable
    }

    async fn nearest_chunks(&self, embedding: &[f32], limit: usize) -> Result<Vec<Chunk>> {
        if !self.vector_capable {
            return Err(Error::not_supported("vector search on this store"));
        }

        let rows = sqlx::query(
            "SELECT id, document_id, chunk_index, content, embedding FROM chunks WHERE embedding IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, Chunk)> = Vec::with_capacity(rows.len());
        for row in &rows {
            let chunk = hydrate_chunk(row)?;
            let distance = chunk
                .embedding
                .as_deref()
                .map(|v| l2_distance(embedding, v))
                .unwrap_or(f32::MAX);
            scored.push((distance, chunk));
        }

        // Distance asc, then chunk index and document id for determinism.
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.chunk_index.cmp(&b.1.chunk_index))
                .then(a.1.document_id.cmp(&b.1.document_id))
        });
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, c)| c).collect())
    }
}

fn hydrate_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk> {
    let blob: Option<Vec<u8>> = row.get("embedding");
    Ok(Chunk {
        id: parse_uuid(row.get("id"))?,
        document_id: parse_uuid(row.get("document_id"))?,
        chunk_index: row.get("chunk_index"),
        content: row.get("content"),
        embedding: blob.as_deref().map(blob_to_vec),
    })
}

fn parse_uuid(value: String) -> Result<Uuid> {
    Uuid::parse_str(&value).map_err(Error::upstream)
}

/// Escape LIKE metacharacters so user queries match literally.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
