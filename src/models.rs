//! Core data models used throughout docbase.
//!
//! These types represent the documents, chunks, search matches, and agent
//! trace records that flow through the ingestion and retrieval pipeline.
//! Documents and chunks are immutable after creation: there is no update
//! path, only append (ingestion) and cascade delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored document with its ordered chunks.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub source: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub chunks: Vec<Chunk>,
}

/// One chunk of a document's text, optionally carrying an embedding.
///
/// Chunk indices within a document are contiguous from 0; the store assigns
/// them from insertion order so the invariant holds by construction.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: i64,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// A document awaiting persistence; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub source: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Chunk content (and optional embedding) awaiting persistence. The chunk
/// index is assigned by the store from slice position.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

/// A retrieval hit, derived at query time and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub document_id: Uuid,
    pub chunk_index: i64,
    pub content: String,
}

/// One entry in the agent execution trace.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<serde_json::Value>,
}

impl AgentStep {
    /// A trace entry with no tool attribution (plan / answer steps).
    pub fn note(kind: &str, message: &str) -> Self {
        Self {
            kind: kind.to_string(),
            message: message.to_string(),
            tool_name: None,
            tool_input: None,
            tool_output: None,
        }
    }
}

/// Final agent output: the answer plus the ordered step trace.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub answer: String,
    pub steps: Vec<AgentStep>,
}
