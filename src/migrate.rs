use sqlx::Connection;
use std::path::Path;

use crate::db;
use crate::error::Result;

/// Create the schema if it does not exist. Safe to run repeatedly.
pub async fn run_migrations(db_path: &Path) -> Result<()> {
    let options = db::options(db_path, true)?;
    let mut conn = db::connect(&options).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_name TEXT NOT NULL,
            upload_date INTEGER NOT NULL
        )
        "#,
    )
    .execute(&mut conn)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id INTEGER NOT NULL REFERENCES documents(id),
            page_number INTEGER NOT NULL CHECK (page_number >= 1),
            page_title TEXT,
            entities_json TEXT,
            content TEXT NOT NULL CHECK (length(trim(content)) > 0),
            tokens INTEGER NOT NULL CHECK (tokens > 0),
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(&mut conn)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first.
    // rowid mirrors chunks.id.
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='chunks_fts'",
    )
    .fetch_one(&mut conn)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE chunks_fts USING fts5(
                content,
                tokenize = 'porter unicode61'
            )
            "#,
        )
        .execute(&mut conn)
        .await?;
    }

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
        .execute(&mut conn)
        .await?;

    conn.close().await?;
    Ok(())
}
