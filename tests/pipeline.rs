//! End-to-end pipeline tests against a real temporary SQLite database:
//! ingest, list, search in both modes, agent execution, and deletion.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use docbase::agent::{DocumentSearchTool, SimpleAgent, Tool, ToolRegistry};
use docbase::config::ChunkingConfig;
use docbase::db;
use docbase::embedding::{self, EmbeddingProvider, StubProvider};
use docbase::error::{Error, Result};
use docbase::ingest::{IngestRequest, IngestionService};
use docbase::llm::{GenerationProvider, GenerationResponse};
use docbase::migrate;
use docbase::search::SearchEngine;
use docbase::store::{DocumentStore, SqliteStore};

struct TestEnv {
    // Held so the database file outlives the stores that use it.
    _dir: TempDir,
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl TestEnv {
    async fn new(vector_capable: bool) -> Self {
        let dir = TempDir::new().unwrap();
        let pool = db::connect(&dir.path().join("test.sqlite")).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        Self {
            _dir: dir,
            store: Arc::new(SqliteStore::new(pool, vector_capable)),
            embedder: Arc::new(StubProvider::new(embedding::DEFAULT_DIMS)),
        }
    }

    fn ingestion(&self, embed_chunks: bool) -> IngestionService {
        IngestionService::new(
            self.store.clone(),
            self.embedder.clone(),
            &ChunkingConfig {
                chunk_size: 800,
                overlap: 80,
            },
            embed_chunks,
        )
    }

    fn engine(&self) -> Arc<SearchEngine> {
        Arc::new(SearchEngine::new(self.store.clone(), self.embedder.clone()))
    }

    async fn ingest_text(&self, filename: &str, text: &str) -> docbase::models::Document {
        self.ingestion(true)
            .ingest(plain_text(filename, text))
            .await
            .unwrap()
    }
}

fn plain_text(filename: &str, text: &str) -> IngestRequest {
    IngestRequest {
        bytes: text.as_bytes().to_vec(),
        content_type: Some("text/plain".to_string()),
        filename: filename.to_string(),
        title: None,
        source: None,
        metadata: None,
    }
}

/// Stub generation provider with no environment dependence.
struct EchoLlm;

#[async_trait]
impl GenerationProvider for EchoLlm {
    async fn complete(&self, prompt: &str) -> Result<GenerationResponse> {
        Ok(GenerationResponse {
            provider: "test".to_string(),
            text: format!("[echo] {}", prompt),
        })
    }
}

#[tokio::test]
async fn ingest_persists_document_with_indexed_chunks() {
    let env = TestEnv::new(true).await;

    let doc = env
        .ingest_text("notes.txt", "hello world. second paragraph.")
        .await;

    assert_eq!(doc.title, "notes.txt");
    assert_eq!(doc.source.as_deref(), Some("notes.txt"));
    assert_eq!(doc.chunks.len(), 1);
    assert_eq!(doc.chunks[0].chunk_index, 0);
    assert!(doc.chunks[0].embedding.is_some());

    let listed = env.store.list_documents().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, doc.id);
    assert_eq!(listed[0].chunks.len(), 1);
    assert_eq!(listed[0].chunks[0].content, doc.chunks[0].content);
}

#[tokio::test]
async fn chunk_indices_are_contiguous_for_long_documents() {
    let env = TestEnv::new(true).await;
    let long_text = "word ".repeat(2000);

    let doc = env.ingest_text("long.txt", &long_text).await;

    assert!(doc.chunks.len() > 1);
    for (i, chunk) in doc.chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i as i64);
    }
}

#[tokio::test]
async fn empty_upload_is_rejected_and_nothing_is_stored() {
    let env = TestEnv::new(true).await;

    let err = env
        .ingestion(true)
        .ingest(plain_text("empty.txt", "   \n\n  "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert!(env.store.list_documents().await.unwrap().is_empty());
}

#[tokio::test]
async fn keyword_search_ranks_by_distinct_token_hits() {
    let env = TestEnv::new(true).await;
    env.ingest_text("a.txt", "hello world").await;
    env.ingest_text("b.txt", "world peace").await;
    env.ingest_text("c.txt", "unrelated text").await;

    let matches = env.engine().search("hello world", 10).await.unwrap();

    assert_eq!(matches.len(), 2);
    // Both tokens hit the first chunk, only one hits the second.
    assert_eq!(matches[0].content, "hello world");
    assert_eq!(matches[1].content, "world peace");
}

#[tokio::test]
async fn short_query_falls_back_to_substring_containment() {
    let env = TestEnv::new(true).await;
    env.ingest_text("a.txt", "the AI revolution").await;
    env.ingest_text("b.txt", "simple farming notes").await;

    // "ai" is below the three-char token floor.
    let matches = env.engine().search("ai", 10).await.unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].content, "the AI revolution");
}

#[tokio::test]
async fn empty_query_yields_no_matches() {
    let env = TestEnv::new(true).await;
    env.ingest_text("a.txt", "some content").await;

    assert!(env.engine().search("   ", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn vector_search_puts_the_exact_text_first() {
    let env = TestEnv::new(true).await;
    env.ingest_text("a.txt", "rust ownership rules").await;
    env.ingest_text("b.txt", "gardening in spring").await;

    // The stub embeds identical text to the identical vector, so the
    // self-match has distance zero and must rank first.
    let matches = env
        .engine()
        .search_by_vector("rust ownership rules", 2)
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].content, "rust ownership rules");
}

#[tokio::test]
async fn vector_search_falls_back_to_keyword_without_the_capability() {
    let env = TestEnv::new(false).await;
    env.ingestion(false)
        .ingest(plain_text("a.txt", "hello world"))
        .await
        .unwrap();

    let keyword = env.engine().search("hello", 10).await.unwrap();
    let vector = env.engine().search_by_vector("hello", 10).await.unwrap();

    assert_eq!(keyword, vector);
    assert_eq!(vector.len(), 1);
}

#[tokio::test]
async fn delete_removes_document_and_its_chunks_from_search() {
    let env = TestEnv::new(true).await;
    let doc = env.ingest_text("a.txt", "findable content here").await;

    assert!(env.store.delete_document(doc.id).await.unwrap());
    assert!(!env.store.delete_document(doc.id).await.unwrap());

    assert!(env.store.list_documents().await.unwrap().is_empty());
    assert!(env
        .engine()
        .search("findable", 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn agent_records_plan_tool_call_answer_in_order() {
    let env = TestEnv::new(true).await;
    env.ingest_text("a.txt", "deployment uses blue-green rollout")
        .await;

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(DocumentSearchTool::new(env.engine())));
    let agent = SimpleAgent::new(Arc::new(EchoLlm), tools);

    let result = agent.execute("how do we deploy?", 5).await.unwrap();

    let kinds: Vec<&str> = result.steps.iter().map(|s| s.kind.as_str()).collect();
    assert_eq!(kinds, vec!["plan", "tool_call", "answer"]);

    let tool_step = &result.steps[1];
    assert_eq!(tool_step.tool_name.as_deref(), Some("document_search"));
    let match_count = tool_step
        .tool_output
        .as_ref()
        .and_then(|o| o.get("match_count"))
        .and_then(Value::as_u64)
        .unwrap();
    assert!(match_count >= 1 && match_count <= 5);

    assert!(result.answer.contains("blue-green rollout"));
}

#[tokio::test]
async fn agent_rejects_blank_goal_before_any_retrieval() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    struct CountingTool;

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "document_search"
        }
        fn description(&self) -> &str {
            "counts invocations"
        }
        async fn run(&self, _input: Value) -> Result<Value> {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "matches": [] }))
        }
    }

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(CountingTool));
    let agent = SimpleAgent::new(Arc::new(EchoLlm), tools);

    let err = agent.execute("   ", 5).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn agent_limits_context_to_max_chunks() {
    let env = TestEnv::new(true).await;
    for i in 0..6 {
        env.ingest_text(&format!("doc{}.txt", i), &format!("shared topic note {}", i))
            .await;
    }

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(DocumentSearchTool::new(env.engine())));
    let agent = SimpleAgent::new(Arc::new(EchoLlm), tools);

    let result = agent.execute("shared topic", 2).await.unwrap();
    let match_count = result.steps[1]
        .tool_output
        .as_ref()
        .and_then(|o| o.get("match_count"))
        .and_then(Value::as_u64)
        .unwrap();
    assert!(match_count <= 2);
}
