//! JSON HTTP API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/documents` | Upload a document (base64 payload) |
//! | `GET`  | `/documents` | List stored documents |
//! | `DELETE` | `/documents/{id}` | Delete a document and its chunks |
//! | `POST` | `/search` | Keyword search over chunks |
//! | `POST` | `/chat` | Retrieval-augmented chat |
//! | `POST` | `/agents/execute` | Run the retrieve-then-generate agent |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Codes: `bad_request` (400), `not_supported` (400), `not_found` (404),
//! `internal` (500). Validation failures map to 400; upstream storage or
//! generation failures are logged and map to 500.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser
//! frontends during development.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::agent::{DocumentSearchTool, SimpleAgent, ToolRegistry};
use crate::config::Config;
use crate::error::Error;
use crate::ingest::{IngestRequest, IngestionService};
use crate::llm::GenerationProvider;
use crate::models::{AgentStep, SearchMatch};
use crate::search::SearchEngine;
use crate::store::DocumentStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    ingestion: Arc<IngestionService>,
    engine: Arc<SearchEngine>,
    llm: Arc<dyn GenerationProvider>,
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(
    config: Arc<Config>,
    store: Arc<dyn DocumentStore>,
    ingestion: Arc<IngestionService>,
    engine: Arc<SearchEngine>,
    llm: Arc<dyn GenerationProvider>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config,
        store,
        ingestion,
        engine,
        llm,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_upload).get(handle_list))
        .route("/documents/{id}", delete(handle_delete))
        .route("/search", post(handle_search))
        .route("/chat", post(handle_chat))
        .route("/agents/execute", post(handle_agent))
        .layer(cors)
        .with_state(state);

    tracing::info!("listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(message) => bad_request(message),
            Error::NotSupported(what) => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "not_supported",
                message: format!("not supported: {}", what),
            },
            Error::Upstream(e) => {
                tracing::error!("upstream failure: {:#}", e);
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: "internal error".to_string(),
                }
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /documents ============

#[derive(Deserialize)]
struct DocumentUploadRequest {
    filename: String,
    /// Raw file bytes, base64-encoded.
    content_base64: String,
    content_type: Option<String>,
    title: Option<String>,
    source: Option<String>,
    metadata: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct DocumentIngestResponse {
    id: Uuid,
    title: String,
    source: Option<String>,
    chunk_count: usize,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(payload): Json<DocumentUploadRequest>,
) -> Result<Json<DocumentIngestResponse>, AppError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&payload.content_base64)
        .map_err(|_| bad_request("content_base64 is not valid base64"))?;

    if bytes.is_empty() {
        return Err(bad_request("uploaded file is empty or unreadable"));
    }

    let document = state
        .ingestion
        .ingest(IngestRequest {
            bytes,
            content_type: payload.content_type,
            filename: payload.filename,
            title: payload.title,
            source: payload.source,
            metadata: payload.metadata,
        })
        .await?;

    Ok(Json(DocumentIngestResponse {
        id: document.id,
        title: document.title,
        source: document.source,
        chunk_count: document.chunks.len(),
    }))
}

// ============ GET /documents ============

#[derive(Serialize)]
struct DocumentSummary {
    id: Uuid,
    title: String,
    source: Option<String>,
    created_at: DateTime<Utc>,
    chunk_count: usize,
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentSummary>,
}

async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let documents = state
        .store
        .list_documents()
        .await?
        .into_iter()
        .map(|d| DocumentSummary {
            id: d.id,
            title: d.title,
            source: d.source,
            created_at: d.created_at,
            chunk_count: d.chunks.len(),
        })
        .collect();

    Ok(Json(DocumentListResponse { documents }))
}

// ============ DELETE /documents/{id} ============

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.store.delete_document(id).await?;
    if !deleted {
        return Err(not_found(format!("no document with id {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    matches: Vec<SearchMatch>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if payload.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let limit = clamp_limit(&state.config, payload.limit);
    let matches = state.engine.search(&payload.query, limit).await?;
    Ok(Json(SearchResponse { matches }))
}

// ============ POST /chat ============

#[derive(Deserialize)]
struct ChatRequest {
    query: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct ChatResponse {
    provider: String,
    answer: String,
    contexts: Vec<String>,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if payload.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let top_k = clamp_limit(&state.config, payload.top_k);
    let matches = state.engine.search_by_vector(&payload.query, top_k).await?;
    let contexts: Vec<String> = matches.into_iter().map(|m| m.content).collect();

    let prompt = if contexts.is_empty() {
        format!(
            "Answer the question below. No stored documents were relevant.\n\nQuestion: {}",
            payload.query.trim()
        )
    } else {
        format!(
            "Use the following context to answer the question.\n\n\
             Context:\n{}\n\nQuestion: {}",
            contexts.join("\n---\n"),
            payload.query.trim()
        )
    };

    let response = state.llm.complete(&prompt).await?;
    Ok(Json(ChatResponse {
        provider: response.provider,
        answer: response.text,
        contexts,
    }))
}

// ============ POST /agents/execute ============

#[derive(Deserialize)]
struct AgentExecuteRequest {
    goal: String,
    max_chunks: Option<usize>,
}

#[derive(Serialize)]
struct AgentExecuteResponse {
    answer: String,
    steps: Vec<AgentStep>,
}

async fn handle_agent(
    State(state): State<AppState>,
    Json(payload): Json<AgentExecuteRequest>,
) -> Result<Json<AgentExecuteResponse>, AppError> {
    let max_chunks = payload.max_chunks.unwrap_or(state.config.search.default_limit);
    if !(1..=crate::agent::MAX_CHUNKS_CEILING).contains(&max_chunks) {
        return Err(bad_request(format!(
            "max_chunks must be in [1, {}]",
            crate::agent::MAX_CHUNKS_CEILING
        )));
    }

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(DocumentSearchTool::new(state.engine.clone())));
    let agent = SimpleAgent::new(state.llm.clone(), tools);

    let result = agent.execute(&payload.goal, max_chunks).await?;
    Ok(Json(AgentExecuteResponse {
        answer: result.answer,
        steps: result.steps,
    }))
}

fn clamp_limit(config: &Config, requested: Option<usize>) -> usize {
    requested
        .unwrap_or(config.search.default_limit)
        .clamp(1, config.search.max_limit)
}
