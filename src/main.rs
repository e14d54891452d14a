//! # Docbase CLI (`docbase`)
//!
//! The `docbase` binary is the primary interface for Docbase. It provides
//! commands for database initialization, document ingestion, search,
//! retrieval-augmented chat, agent execution, and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! docbase --config ./config/docbase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docbase init` | Create the SQLite database and run schema migrations |
//! | `docbase ingest <path>` | Ingest a local file |
//! | `docbase list` | List stored documents |
//! | `docbase delete <id>` | Delete a document by UUID |
//! | `docbase search "<query>"` | Search stored chunks |
//! | `docbase chat "<query>"` | Retrieval-augmented chat |
//! | `docbase agent "<goal>"` | Run the retrieve-then-generate agent |
//! | `docbase serve` | Start the JSON HTTP server |

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docbase::agent::{DocumentSearchTool, SimpleAgent, ToolRegistry, MAX_CHUNKS_CEILING};
use docbase::config::{self, Config};
use docbase::embedding::{self, EmbeddingProvider};
use docbase::ingest::{IngestRequest, IngestionService};
use docbase::llm::{GenerationProvider, StubGenerationProvider};
use docbase::search::SearchEngine;
use docbase::store::{DocumentStore, SqliteStore};
use docbase::{db, migrate, server};

/// Docbase CLI — a local-first document ingestion and retrieval backend
/// for AI tools.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docbase.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docbase",
    about = "Docbase — a local-first document ingestion and retrieval backend for AI tools",
    version,
    long_about = "Docbase ingests uploaded documents (plain text, PDF, DOCX), chunks and \
    embeds them into SQLite, and exposes keyword and vector search, retrieval-augmented \
    chat, and a single-pass agent via a CLI and JSON HTTP server."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docbase.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents and chunks
    /// tables. This command is idempotent.
    Init,

    /// Ingest a local file.
    ///
    /// Extracts text, chunks it, optionally embeds the chunks, and stores
    /// the document. The content type is inferred from the file extension.
    Ingest {
        /// Path to the file to ingest.
        path: PathBuf,

        /// Document title. Defaults to the filename.
        #[arg(long)]
        title: Option<String>,

        /// Source label. Defaults to the filename.
        #[arg(long)]
        source: Option<String>,
    },

    /// List stored documents with their chunk counts.
    List,

    /// Delete a document and its chunks by UUID.
    Delete {
        /// Document UUID.
        id: uuid::Uuid,
    },

    /// Search stored chunks.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long, default_value_t = 5)]
        limit: usize,

        /// Search mode: `keyword` (token ranking) or `vector` (embedding
        /// distance, falls back to keyword when embeddings are disabled).
        #[arg(long, default_value = "keyword")]
        mode: String,
    },

    /// Ask a question answered from retrieved document context.
    Chat {
        /// The question to answer.
        query: String,

        /// Number of context chunks to retrieve.
        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },

    /// Run the retrieve-then-generate agent and print its step trace.
    Agent {
        /// The goal to accomplish.
        goal: String,

        /// Maximum chunks the agent may retrieve (1-20).
        #[arg(long, default_value_t = 5)]
        max_chunks: usize,
    },

    /// Start the JSON HTTP server on the configured bind address.
    Serve,
}

/// Everything a command needs, built once from config.
struct Runtime {
    store: Arc<dyn DocumentStore>,
    engine: Arc<SearchEngine>,
    ingestion: Arc<IngestionService>,
    llm: Arc<dyn GenerationProvider>,
}

async fn build_runtime(cfg: &Config) -> anyhow::Result<Runtime> {
    let pool = db::connect(&cfg.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let store: Arc<dyn DocumentStore> =
        Arc::new(SqliteStore::new(pool, cfg.embedding.enabled));
    let embedder: Arc<dyn EmbeddingProvider> = embedding::create_provider(&cfg.embedding)?;
    let engine = Arc::new(SearchEngine::new(store.clone(), embedder.clone()));
    let ingestion = Arc::new(IngestionService::new(
        store.clone(),
        embedder,
        &cfg.chunking,
        cfg.embedding.enabled,
    ));
    let llm: Arc<dyn GenerationProvider> = Arc::new(StubGenerationProvider::new(&cfg.llm));

    Ok(Runtime {
        store,
        engine,
        ingestion,
        llm,
    })
}

/// Guess a media type from a file extension for CLI ingestion. The HTTP
/// path receives the declared type from the client instead.
fn content_type_for(path: &std::path::Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let media_type = match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "md" => "text/markdown",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(media_type.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            path,
            title,
            source,
        } => {
            let runtime = build_runtime(&cfg).await?;
            let bytes = std::fs::read(&path)?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();

            let document = runtime
                .ingestion
                .ingest(IngestRequest {
                    content_type: content_type_for(&path),
                    bytes,
                    filename,
                    title,
                    source,
                    metadata: None,
                })
                .await?;

            println!(
                "Ingested '{}' as {} ({} chunks)",
                document.title,
                document.id,
                document.chunks.len()
            );
        }
        Commands::List => {
            let runtime = build_runtime(&cfg).await?;
            let documents = runtime.store.list_documents().await?;
            if documents.is_empty() {
                println!("No documents stored.");
            }
            for doc in documents {
                println!(
                    "{}  {}  ({} chunks, created {})",
                    doc.id,
                    doc.title,
                    doc.chunks.len(),
                    doc.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        Commands::Delete { id } => {
            let runtime = build_runtime(&cfg).await?;
            if runtime.store.delete_document(id).await? {
                println!("Deleted document {}", id);
            } else {
                println!("No document with id {}", id);
            }
        }
        Commands::Search { query, limit, mode } => {
            let runtime = build_runtime(&cfg).await?;
            let limit = limit.clamp(1, cfg.search.max_limit);
            let matches = match mode.as_str() {
                "keyword" => runtime.engine.search(&query, limit).await?,
                "vector" => runtime.engine.search_by_vector(&query, limit).await?,
                other => anyhow::bail!("unknown search mode '{}' (keyword, vector)", other),
            };

            if matches.is_empty() {
                println!("No matches.");
            }
            for m in matches {
                println!("[{}#{}] {}", m.document_id, m.chunk_index, m.content);
            }
        }
        Commands::Chat { query, top_k } => {
            let runtime = build_runtime(&cfg).await?;
            let top_k = top_k.clamp(1, cfg.search.max_limit);
            let matches = runtime.engine.search_by_vector(&query, top_k).await?;

            let prompt = if matches.is_empty() {
                format!(
                    "Answer the question below. No stored documents were relevant.\n\nQuestion: {}",
                    query.trim()
                )
            } else {
                let contexts: Vec<String> =
                    matches.iter().map(|m| m.content.clone()).collect();
                format!(
                    "Use the following context to answer the question.\n\n\
                     Context:\n{}\n\nQuestion: {}",
                    contexts.join("\n---\n"),
                    query.trim()
                )
            };

            let response = runtime.llm.complete(&prompt).await?;
            println!("{}", response.text);
        }
        Commands::Agent { goal, max_chunks } => {
            let runtime = build_runtime(&cfg).await?;
            anyhow::ensure!(
                (1..=MAX_CHUNKS_CEILING).contains(&max_chunks),
                "max-chunks must be in [1, {}]",
                MAX_CHUNKS_CEILING
            );

            let mut tools = ToolRegistry::new();
            tools.register(Arc::new(DocumentSearchTool::new(runtime.engine.clone())));
            let agent = SimpleAgent::new(runtime.llm.clone(), tools);

            let result = agent.execute(&goal, max_chunks).await?;
            for step in &result.steps {
                println!("[{}] {}", step.kind, step.message);
            }
            println!("\n{}", result.answer);
        }
        Commands::Serve => {
            let runtime = build_runtime(&cfg).await?;
            server::run_server(
                Arc::new(cfg),
                runtime.store,
                runtime.ingestion,
                runtime.engine,
                runtime.llm,
            )
            .await?;
        }
    }

    Ok(())
}
