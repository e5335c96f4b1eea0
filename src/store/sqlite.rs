use std::time::Duration;

use tokio_rusqlite::Connection;

use crate::error::{AppError, AppResult, StoreError};

/// How long a writer waits on a lock held by another controller process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (and initializes) the database shared by the agent registry and
/// the cache transport.
///
/// # Errors
///
/// Returns an error when the database cannot be opened or the schema
/// cannot be created.
pub async fn open_database(path: &str) -> AppResult<Connection> {
    let conn = Connection::open(path)
        .await
        .map_err(sqlite_error("open sqlite db"))?;
    conn.call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS agents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip TEXT NOT NULL,
                name TEXT NOT NULL,
                port INTEGER NOT NULL,
                region TEXT NOT NULL,
                status TEXT NOT NULL,
                approved INTEGER NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 1,
                UNIQUE (ip, name)
            );
            CREATE INDEX IF NOT EXISTS idx_agents_region ON agents(region);
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                expires_at_ms INTEGER NOT NULL,
                PRIMARY KEY (cache, key)
            );
            CREATE INDEX IF NOT EXISTS idx_cache_entries_expiry
                ON cache_entries(cache, expires_at_ms);",
        )?;
        Ok(())
    })
    .await
    .map_err(sqlite_error("initialize sqlite db"))?;
    Ok(conn)
}

pub(super) fn sqlite_error(context: &'static str) -> impl FnOnce(tokio_rusqlite::Error) -> AppError {
    move |err| AppError::store(StoreError::Sqlite {
        context,
        source: err,
    })
}

pub(super) fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
