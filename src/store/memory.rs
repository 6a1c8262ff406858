//! In-memory [`Store`] implementation for testing.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Lexical matching evaluates the
//! parsed [`WebQuery`] against each chunk's [`lexical::index_tokens`];
//! distances are brute-force cosine over all chunks of the document.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::{Error, Result};
use crate::lexical::{self, WebQuery};
use crate::models::{Chunk, ChunkHit, Document, DocumentSummary, NewChunk};

use super::{validate_chunks, Store};

struct Tables {
    documents: Vec<Document>,
    chunks: Vec<StoredChunk>,
    next_document_id: i64,
    next_chunk_id: i64,
}

struct StoredChunk {
    chunk: Chunk,
    tokens: Vec<String>,
}

/// In-memory store for tests and experiments.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                documents: Vec::new(),
                chunks: Vec::new(),
                next_document_id: 1,
                next_chunk_id: 1,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_document(&self, file_name: &str, chunks: &[NewChunk]) -> Result<i64> {
        validate_chunks(chunks)?;

        let mut tables = self.write();
        let document_id = tables.next_document_id;
        tables.next_document_id += 1;
        tables.documents.push(Document {
            id: document_id,
            file_name: file_name.to_string(),
            upload_date: chrono::Utc::now().timestamp(),
        });

        for c in chunks {
            let id = tables.next_chunk_id;
            tables.next_chunk_id += 1;
            tables.chunks.push(StoredChunk {
                tokens: lexical::index_tokens(&c.content),
                chunk: Chunk {
                    id,
                    document_id,
                    page_number: c.page_number,
                    page_title: c.page_title.clone(),
                    entities: c.entities.clone(),
                    content: c.content.clone(),
                    tokens: c.tokens,
                    embedding: c.embedding.clone(),
                },
            });
        }

        Ok(document_id)
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        Ok(self.read().documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let tables = self.read();
        Ok(tables
            .documents
            .iter()
            .map(|d| DocumentSummary {
                document: d.clone(),
                chunk_count: tables
                    .chunks
                    .iter()
                    .filter(|sc| sc.chunk.document_id == d.id)
                    .count() as i64,
            })
            .collect())
    }

    async fn document_chunks(&self, document_id: i64) -> Result<Vec<Chunk>> {
        Ok(self
            .read()
            .chunks
            .iter()
            .filter(|sc| sc.chunk.document_id == document_id)
            .map(|sc| sc.chunk.clone())
            .collect())
    }

    async fn lexical_matches(&self, document_id: i64, query: &str) -> Result<Vec<ChunkHit>> {
        let parsed = WebQuery::parse(query);
        if parsed.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .read()
            .chunks
            .iter()
            .filter(|sc| sc.chunk.document_id == document_id && parsed.matches(&sc.tokens))
            .map(|sc| ChunkHit {
                chunk_id: sc.chunk.id,
                page_number: sc.chunk.page_number,
                content: sc.chunk.content.clone(),
                score: parsed.rank(&sc.tokens),
            })
            .collect())
    }

    async fn chunk_distances(&self, document_id: i64, query_vec: &[f32]) -> Result<Vec<ChunkHit>> {
        self.read()
            .chunks
            .iter()
            .filter(|sc| sc.chunk.document_id == document_id)
            .map(|sc| {
                if sc.chunk.embedding.len() != query_vec.len() {
                    return Err(Error::DimensionMismatch {
                        expected: sc.chunk.embedding.len(),
                        actual: query_vec.len(),
                    });
                }
                Ok(ChunkHit {
                    chunk_id: sc.chunk.id,
                    page_number: sc.chunk.page_number,
                    content: sc.chunk.content.clone(),
                    score: cosine_distance(query_vec, &sc.chunk.embedding),
                })
            })
            .collect()
    }
}
