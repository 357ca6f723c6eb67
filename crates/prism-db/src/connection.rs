//! Connection pool setup.
//!
//! File-backed stores run in WAL mode with a busy timeout so readers never
//! block the single writer for long. In-memory stores pin one connection for
//! the pool's lifetime, since every `SQLite` connection to `:memory:` opens a
//! separate database.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if missing) a database file.
///
/// # Errors
/// Returns `DatabaseError::Open` if the parent directory cannot be created or
/// the file cannot be opened as a `SQLite` database.
pub async fn connect(path: impl AsRef<Path>, max_connections: u32) -> Result<Pool<Sqlite>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Open(format!("{}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), max_connections, "Database pool created");
    Ok(pool)
}

/// Open a private in-memory database.
pub async fn connect_in_memory() -> Result<Pool<Sqlite>> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Open(format!("in-memory database: {e}")))
}
