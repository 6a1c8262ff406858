//! # IntelliDoc
//!
//! PDF ingestion and retrieval over page-bounded chunks.
//!
//! A PDF is split into per-page text, chunked by word count, embedded, and
//! stored in SQLite alongside an FTS5 index. Searches run against a single
//! document in one of three modes (lexical, vector, hybrid), and a QA flow
//! feeds the retrieved chunks to a language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐
//! │   PDF    │──▶│ Chunk+Embed  │──▶│   SQLite    │
//! │ (pages)  │   │              │   │ FTS5 + BLOB │
//! └──────────┘   └──────────────┘   └──────┬──────┘
//!                                          │
//!                 ┌────────────────────────┤
//!                 ▼                        ▼
//!          ┌────────────┐          ┌──────────────┐
//!          │  Searcher  │─────────▶│   QaEngine   │──▶ LLM
//!          │ lex/vec/hyb│          │              │
//!          └────────────┘          └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! intellidoc init
//! intellidoc ingest report.pdf --name report.pdf
//! intellidoc search hybrid "quarterly revenue" --document 1
//! intellidoc qa vector "revenue" --document 1 --question "How did revenue change?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`db`] | Per-operation SQLite connections |
//! | [`migrate`] | Schema creation |
//! | [`store`] | Storage trait and in-memory backend |
//! | [`sqlite_store`] | SQLite/FTS5 backend |
//! | [`lexical`] | Web-search query grammar and tokenizer |
//! | [`embedding`] | Embedding providers and vector math |
//! | [`openai`] | Shared OpenAI client |
//! | [`llm`] | Language-model boundary |
//! | [`search`] | Lexical, vector, and hybrid search |
//! | [`qa`] | Question answering |
//! | [`chunk`] | Page-bounded chunking |
//! | [`extract`] | PDF text extraction |
//! | [`ingest`] | Ingestion pipeline |
//! | [`output`] | CSV and QA report artifacts |

pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod lexical;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod openai;
pub mod output;
pub mod qa;
pub mod search;
pub mod sqlite_store;
pub mod store;

pub use error::{Error, Result};
