//! # Docbase
//!
//! A local-first document ingestion and retrieval backend for AI tools.
//!
//! Docbase takes uploaded files (plain text, PDF, DOCX), extracts their
//! text, splits it into overlapping chunks, optionally embeds each chunk
//! with a deterministic stub provider, and stores everything in SQLite.
//! Retrieval runs as keyword search or nearest-neighbor vector search, and
//! a single-pass agent combines retrieval with a generation provider to
//! answer goals with a recorded step trace.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌──────────┐
//! │ Uploads  │──▶│     Pipeline      │──▶│  SQLite   │
//! │ txt/pdf/ │   │ Extract+Chunk+   │   │ docs +   │
//! │ docx     │   │ Embed            │   │ chunks   │
//! └──────────┘   └──────────────────┘   └────┬─────┘
//!                                            │
//!                        ┌───────────────────┤
//!                        ▼                   ▼
//!                   ┌──────────┐       ┌──────────┐
//!                   │   CLI    │       │   HTTP   │
//!                   │(docbase) │       │  (JSON)  │
//!                   └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docbase init                        # create database
//! docbase ingest ./notes.txt          # ingest a file
//! docbase search "deployment"        # keyword search
//! docbase agent "summarize my notes" # retrieve + generate
//! docbase serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Text extraction from uploaded bytes |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Persistence contract and SQLite store |
//! | [`ingest`] | Ingestion pipeline orchestration |
//! | [`search`] | Keyword and vector search |
//! | [`llm`] | Generation provider facade |
//! | [`agent`] | Retrieve-then-generate agent |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`error`] | Error taxonomy |

pub mod agent;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod search;
pub mod server;
pub mod store;
