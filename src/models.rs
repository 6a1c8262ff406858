//! Core data models used throughout IntelliDoc.
//!
//! These types represent the documents, chunks, and search results that flow
//! through the ingestion and retrieval pipeline.

/// An ingested PDF. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: i64,
    pub file_name: String,
    /// Unix timestamp (seconds) of ingestion.
    pub upload_date: i64,
}

/// Document listing entry with its chunk count.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub document: Document,
    pub chunk_count: i64,
}

/// A stored chunk of a document's page text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: i64,
    pub document_id: i64,
    /// 1-based page number.
    pub page_number: i64,
    pub page_title: Option<String>,
    pub entities: Option<Vec<String>>,
    pub content: String,
    pub tokens: i64,
    pub embedding: Vec<f32>,
}

/// A chunk produced by ingestion, before it has an id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub page_number: i64,
    pub page_title: Option<String>,
    pub entities: Option<Vec<String>>,
    pub content: String,
    pub tokens: i64,
    pub embedding: Vec<f32>,
}

/// A chunk row scored by one retrieval branch.
///
/// `score` is a lexical rank for lexical matches and a cosine distance for
/// vector matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub chunk_id: i64,
    pub page_number: i64,
    pub content: String,
    pub score: f64,
}

/// One row of search output.
///
/// Rows produced by a single branch carry that branch's score and `0.0` for
/// the other axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk_id: i64,
    pub page_number: i64,
    pub content: String,
    pub rank: f64,
    pub distance: f64,
}

impl SearchResult {
    pub fn from_lexical(hit: ChunkHit) -> Self {
        Self {
            chunk_id: hit.chunk_id,
            page_number: hit.page_number,
            content: hit.content,
            rank: hit.score.max(0.0),
            distance: 0.0,
        }
    }

    pub fn from_vector(hit: ChunkHit) -> Self {
        Self {
            chunk_id: hit.chunk_id,
            page_number: hit.page_number,
            content: hit.content,
            rank: 0.0,
            distance: hit.score,
        }
    }

    /// Hybrid ordering key: `rank + (1 - distance)`.
    pub fn combined_score(&self) -> f64 {
        self.rank + (1.0 - self.distance)
    }
}

/// Record of one question-answering call.
#[derive(Debug, Clone, PartialEq)]
pub struct QaExchange {
    pub search_type: String,
    pub query: String,
    pub document_id: i64,
    pub context: String,
    pub question: String,
    pub model: String,
    pub answer: String,
}
