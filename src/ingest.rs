//! Ingestion pipeline orchestration.
//!
//! Coordinates the flow for one PDF: extraction → page chunking →
//! embedding → storage. Every chunk is embedded before anything is written,
//! and the document plus all of its chunks are inserted as one unit, so a
//! failure at any step leaves the store unchanged.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::chunk::chunk_pages;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::extract;
use crate::models::NewChunk;
use crate::store::Store;

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub document_id: i64,
    pub pages: usize,
    pub chunks: usize,
}

/// Extract, chunk, embed, and store the PDF at `path` under `file_name`.
///
/// An unreadable or unparsable PDF fails with [`Error::Io`] or
/// [`Error::Extract`] before any document is created.
pub async fn ingest_pdf(
    config: &Config,
    store: &dyn Store,
    embedder: &dyn Embedder,
    path: &Path,
    file_name: &str,
) -> Result<IngestReport> {
    let pages = extract::extract_pages_from_path(path)?;
    info!(path = %path.display(), pages = pages.len(), "extracted PDF");
    ingest_pages(config, store, embedder, file_name, &pages).await
}

/// Chunk, embed, and store already-extracted page texts (`pages[0]` is page 1).
pub async fn ingest_pages(
    config: &Config,
    store: &dyn Store,
    embedder: &dyn Embedder,
    file_name: &str,
    pages: &[String],
) -> Result<IngestReport> {
    let page_chunks = chunk_pages(pages, config.chunking.max_tokens);
    if page_chunks.is_empty() {
        warn!(file_name, "no extractable text; storing document without chunks");
    }

    let texts: Vec<String> = page_chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embed_all(embedder, &texts, config.embedding.batch_size).await?;

    let chunks: Vec<NewChunk> = page_chunks
        .into_iter()
        .zip(vectors)
        .map(|(c, embedding)| NewChunk {
            page_number: c.page_number,
            page_title: None,
            entities: None,
            content: c.content,
            tokens: c.tokens,
            embedding,
        })
        .collect();

    let document_id = store.insert_document(file_name, &chunks).await?;
    info!(document_id, file_name, chunks = chunks.len(), "ingested document");

    Ok(IngestReport {
        document_id,
        pages: pages.len(),
        chunks: chunks.len(),
    })
}

/// Embed `texts` in batches, checking count and dimension of every vector.
async fn embed_all(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        debug!(model = embedder.model_name(), batch = batch.len(), "embedding chunks");
        let embedded = embedder.embed_batch(batch).await?;
        if embedded.len() != batch.len() {
            return Err(Error::external(
                embedder.model_name(),
                format!("expected {} embeddings, got {}", batch.len(), embedded.len()),
            ));
        }
        for v in &embedded {
            if v.len() != embedder.dims() {
                return Err(Error::DimensionMismatch {
                    expected: embedder.dims(),
                    actual: v.len(),
                });
            }
        }
        vectors.extend(embedded);
    }

    Ok(vectors)
}
