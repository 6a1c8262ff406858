use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode};
use sqlx::ConnectOptions;
use std::path::Path;

use crate::error::{Error, Result};

/// Connection options for the database file at `path`.
///
/// With `create` set, the parent directory and the file are created when
/// missing; otherwise a missing database is a connection failure.
pub fn options(path: &Path, create: bool) -> Result<SqliteConnectOptions> {
    if create {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);

    Ok(options)
}

/// Open one connection. The caller owns it for the duration of a single
/// operation and closes it when done; dropping it also closes it.
pub async fn connect(options: &SqliteConnectOptions) -> Result<SqliteConnection> {
    options
        .connect()
        .await
        .map_err(|e| Error::Connection(e.to_string()))
}
