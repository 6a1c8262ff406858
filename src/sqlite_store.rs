//! SQLite-backed [`Store`] implementation.
//!
//! Every operation opens its own connection from the stored options and
//! drops it before returning. Lexical matching runs on the `chunks_fts`
//! FTS5 table (whose rowid mirrors `chunks.id`); cosine distances are
//! computed in Rust over the stored embedding BLOBs.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Connection, Row};
use std::path::Path;
use tracing::debug;

use crate::db;
use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::error::{Error, Result};
use crate::lexical::WebQuery;
use crate::models::{Chunk, ChunkHit, Document, DocumentSummary, NewChunk};
use crate::store::Store;

/// SQLite implementation of the [`Store`] trait.
///
/// Holds connection options only; the database file must already exist
/// (see [`crate::migrate::run_migrations`]).
pub struct SqliteStore {
    options: SqliteConnectOptions,
}

impl SqliteStore {
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self { options }
    }

    /// Store over an existing database file. A missing file surfaces as
    /// [`Error::Connection`] on first use.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(db::options(path, false)?))
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        db::connect(&self.options).await
    }
}

fn hit_from_row(row: &SqliteRow, score: f64) -> Result<ChunkHit> {
    Ok(ChunkHit {
        chunk_id: row.try_get("id")?,
        page_number: row.try_get("page_number")?,
        content: row.try_get("content")?,
        score,
    })
}

async fn lexical_on(
    conn: &mut SqliteConnection,
    document_id: i64,
    query: &str,
) -> Result<Vec<ChunkHit>> {
    let parsed = WebQuery::parse(query);
    let excluded = parsed.fts5_excluded();

    let Some(positive) = parsed.fts5_positive() else {
        // Only exclusions: every chunk of the document without them, unranked.
        let Some(excluded) = excluded else {
            return Ok(Vec::new());
        };
        debug!(document_id, fts = %excluded, "lexical exclusion-only query");
        let rows = sqlx::query(
            r#"
            SELECT id, page_number, content
            FROM chunks
            WHERE document_id = ?
              AND id NOT IN (SELECT rowid FROM chunks_fts WHERE chunks_fts MATCH ?)
            ORDER BY id
            "#,
        )
        .bind(document_id)
        .bind(&excluded)
        .fetch_all(&mut *conn)
        .await?;
        return rows.iter().map(|r| hit_from_row(r, 0.0)).collect();
    };

    let expr = match excluded {
        Some(ex) => format!("({}) NOT ({})", positive, ex),
        None => positive,
    };
    debug!(document_id, fts = %expr, "lexical query");

    let rows = sqlx::query(
        r#"
        SELECT c.id, c.page_number, c.content, bm25(chunks_fts) AS score
        FROM chunks_fts
        JOIN chunks c ON c.id = chunks_fts.rowid
        WHERE chunks_fts MATCH ? AND c.document_id = ?
        ORDER BY c.id
        "#,
    )
    .bind(&expr)
    .bind(document_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            // bm25() is lower-is-better and non-positive; flip it.
            let bm25: f64 = row.try_get("score")?;
            hit_from_row(row, (-bm25).max(0.0))
        })
        .collect()
}

async fn distances_on(
    conn: &mut SqliteConnection,
    document_id: i64,
    query_vec: &[f32],
) -> Result<Vec<ChunkHit>> {
    let rows = sqlx::query(
        "SELECT id, page_number, content, embedding FROM chunks WHERE document_id = ? ORDER BY id",
    )
    .bind(document_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut hits = Vec::with_capacity(rows.len());
    for row in &rows {
        let blob: Vec<u8> = row.try_get("embedding")?;
        let vec = blob_to_vec(&blob);
        if vec.len() != query_vec.len() {
            return Err(Error::DimensionMismatch {
                expected: vec.len(),
                actual: query_vec.len(),
            });
        }
        hits.push(hit_from_row(row, cosine_distance(query_vec, &vec))?);
    }
    Ok(hits)
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, file_name: &str, chunks: &[NewChunk]) -> Result<i64> {
        let mut conn = self.connect().await?;
        let mut tx = conn.begin().await?;

        let document_id = sqlx::query("INSERT INTO documents (file_name, upload_date) VALUES (?, ?)")
            .bind(file_name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for chunk in chunks {
            let entities_json = match &chunk.entities {
                Some(list) => Some(
                    serde_json::to_string(list)
                        .map_err(|e| Error::InvalidArgument(format!("entities: {}", e)))?,
                ),
                None => None,
            };

            let chunk_id = sqlx::query(
                r#"
                INSERT INTO chunks (document_id, page_number, page_title, entities_json,
                                    content, tokens, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(document_id)
            .bind(chunk.page_number)
            .bind(&chunk.page_title)
            .bind(&entities_json)
            .bind(&chunk.content)
            .bind(chunk.tokens)
            .bind(vec_to_blob(&chunk.embedding))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            sqlx::query("INSERT INTO chunks_fts (rowid, content) VALUES (?, ?)")
                .bind(chunk_id)
                .bind(&chunk.content)
                .execute(&mut *tx)
                .await?;
        }

        // Any early return above drops `tx`, which rolls back.
        tx.commit().await?;
        Ok(document_id)
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let mut conn = self.connect().await?;
        let row = sqlx::query("SELECT id, file_name, upload_date FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut conn)
            .await?;

        row.map(|r| -> Result<Document> {
            Ok(Document {
                id: r.try_get("id")?,
                file_name: r.try_get("file_name")?,
                upload_date: r.try_get("upload_date")?,
            })
        })
        .transpose()
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.file_name, d.upload_date, COUNT(c.id) AS chunk_count
            FROM documents d
            LEFT JOIN chunks c ON c.document_id = d.id
            GROUP BY d.id
            ORDER BY d.id
            "#,
        )
        .fetch_all(&mut conn)
        .await?;

        rows.iter()
            .map(|r| -> Result<DocumentSummary> {
                Ok(DocumentSummary {
                    document: Document {
                        id: r.try_get("id")?,
                        file_name: r.try_get("file_name")?,
                        upload_date: r.try_get("upload_date")?,
                    },
                    chunk_count: r.try_get("chunk_count")?,
                })
            })
            .collect()
    }

    async fn document_chunks(&self, document_id: i64) -> Result<Vec<Chunk>> {
        let mut conn = self.connect().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, page_number, page_title, entities_json,
                   content, tokens, embedding
            FROM chunks
            WHERE document_id = ?
            ORDER BY id
            "#,
        )
        .bind(document_id)
        .fetch_all(&mut conn)
        .await?;

        rows.iter()
            .map(|r| -> Result<Chunk> {
                let entities_json: Option<String> = r.try_get("entities_json")?;
                let blob: Vec<u8> = r.try_get("embedding")?;
                Ok(Chunk {
                    id: r.try_get("id")?,
                    document_id: r.try_get("document_id")?,
                    page_number: r.try_get("page_number")?,
                    page_title: r.try_get("page_title")?,
                    entities: entities_json.and_then(|s| serde_json::from_str(&s).ok()),
                    content: r.try_get("content")?,
                    tokens: r.try_get("tokens")?,
                    embedding: blob_to_vec(&blob),
                })
            })
            .collect()
    }

    async fn lexical_matches(&self, document_id: i64, query: &str) -> Result<Vec<ChunkHit>> {
        let mut conn = self.connect().await?;
        lexical_on(&mut conn, document_id, query).await
    }

    async fn chunk_distances(&self, document_id: i64, query_vec: &[f32]) -> Result<Vec<ChunkHit>> {
        let mut conn = self.connect().await?;
        distances_on(&mut conn, document_id, query_vec).await
    }

    async fn hybrid_candidates(
        &self,
        document_id: i64,
        query: &str,
        query_vec: &[f32],
    ) -> Result<(Vec<ChunkHit>, Vec<ChunkHit>)> {
        let mut conn = self.connect().await?;
        let lexical = lexical_on(&mut conn, document_id, query).await?;
        let vector = distances_on(&mut conn, document_id, query_vec).await?;
        Ok((lexical, vector))
    }
}
