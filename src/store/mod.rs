//! Chunk Store abstraction.
//!
//! The [`Store`] trait defines the storage operations needed by ingestion and
//! retrieval, enabling pluggable backends ([`SqliteStore`](crate::sqlite_store::SqliteStore),
//! [`InMemoryStore`]).
//!
//! Implementations acquire whatever connection they need at the start of each
//! call and release it before returning, on success and on error. Nothing is
//! shared between calls except the stored data itself.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, ChunkHit, Document, DocumentSummary, NewChunk};

pub use memory::InMemoryStore;

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_document`](Store::insert_document) | Insert a document and all its chunks atomically |
/// | [`get_document`](Store::get_document) | Fetch document metadata |
/// | [`list_documents`](Store::list_documents) | List documents with chunk counts |
/// | [`document_chunks`](Store::document_chunks) | All chunks of a document, by id |
/// | [`lexical_matches`](Store::lexical_matches) | Chunks matching a web-search query, with rank |
/// | [`chunk_distances`](Store::chunk_distances) | Every chunk of a document with its cosine distance |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a document and its chunks as one unit.
    ///
    /// Returns the new document id. If any chunk fails to insert, nothing
    /// is stored: neither the document nor any of its chunks.
    async fn insert_document(&self, file_name: &str, chunks: &[NewChunk]) -> Result<i64>;

    async fn get_document(&self, id: i64) -> Result<Option<Document>>;

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>>;

    /// Chunks of a document ordered by chunk id.
    async fn document_chunks(&self, document_id: i64) -> Result<Vec<Chunk>>;

    /// Every chunk of `document_id` matching `query` under the web-search
    /// grammar of [`crate::lexical`], with its lexical rank (`>= 0`) in
    /// [`ChunkHit::score`]. Non-matching chunks are absent. Order is by
    /// chunk id; no limit is applied.
    async fn lexical_matches(&self, document_id: i64, query: &str) -> Result<Vec<ChunkHit>>;

    /// Every chunk of `document_id` with its cosine distance to `query_vec`
    /// in [`ChunkHit::score`]. Order is by chunk id; no limit is applied.
    async fn chunk_distances(&self, document_id: i64, query_vec: &[f32]) -> Result<Vec<ChunkHit>>;

    /// Both candidate sets for the hybrid ranker.
    ///
    /// Backends that can serve both from a single connection override this.
    async fn hybrid_candidates(
        &self,
        document_id: i64,
        query: &str,
        query_vec: &[f32],
    ) -> Result<(Vec<ChunkHit>, Vec<ChunkHit>)> {
        let lexical = self.lexical_matches(document_id, query).await?;
        let vector = self.chunk_distances(document_id, query_vec).await?;
        Ok((lexical, vector))
    }
}

/// Check a batch of chunks against the stored-chunk invariants.
pub(crate) fn validate_chunks(chunks: &[NewChunk]) -> Result<()> {
    use crate::error::Error;

    for (i, c) in chunks.iter().enumerate() {
        if c.page_number < 1 {
            return Err(Error::InvalidArgument(format!(
                "chunk {}: page number must be >= 1, got {}",
                i, c.page_number
            )));
        }
        if c.content.trim().is_empty() {
            return Err(Error::InvalidArgument(format!("chunk {}: empty content", i)));
        }
        if c.tokens < 1 {
            return Err(Error::InvalidArgument(format!(
                "chunk {}: token count must be positive, got {}",
                i, c.tokens
            )));
        }
    }

    if let Some(first) = chunks.first() {
        let dims = first.embedding.len();
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dims) {
            return Err(Error::DimensionMismatch {
                expected: dims,
                actual: bad.embedding.len(),
            });
        }
    }

    Ok(())
}
