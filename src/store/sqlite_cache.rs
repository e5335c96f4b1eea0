use std::time::Duration;

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::error::AppResult;
use crate::ports::SharedCache;

use super::sqlite::sqlite_error;

/// Named TTL cache stored in the shared SQLite database.
///
/// Expiry is evaluated against wall-clock millis, so controllers sharing the
/// file must keep their clocks roughly in sync.
#[derive(Clone)]
pub struct SqliteCache {
    conn: Connection,
    name: String,
}

impl SqliteCache {
    #[must_use]
    pub fn new(conn: Connection, name: impl Into<String>) -> Self {
        Self {
            conn,
            name: name.into(),
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn expiry_ms(ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms().saturating_add(ttl_ms)
}

#[async_trait]
impl SharedCache for SqliteCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let cache = self.name.clone();
        let key = key.to_owned();
        let expires_at_ms = expiry_ms(ttl);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO cache_entries (cache, key, value, expires_at_ms)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(cache, key) DO UPDATE
                     SET value = excluded.value, expires_at_ms = excluded.expires_at_ms",
                    rusqlite::params![cache, key, value, expires_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(sqlite_error("write cache entry"))
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let cache = self.name.clone();
        let key = key.to_owned();
        let now = now_ms();
        self.conn
            .call(move |conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM cache_entries
                         WHERE cache = ?1 AND key = ?2 AND expires_at_ms > ?3",
                        rusqlite::params![cache, key, now],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(sqlite_error("read cache entry"))
    }

    async fn live_keys(&self) -> AppResult<Vec<String>> {
        let cache = self.name.clone();
        let now = now_ms();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM cache_entries WHERE cache = ?1 AND expires_at_ms <= ?2",
                    rusqlite::params![cache, now],
                )?;
                let mut stmt =
                    conn.prepare("SELECT key FROM cache_entries WHERE cache = ?1 ORDER BY key")?;
                let keys = stmt
                    .query_map(rusqlite::params![cache], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(sqlite_error("list cache keys"))
    }

    async fn evict(&self, key: &str) -> AppResult<()> {
        let cache = self.name.clone();
        let key = key.to_owned();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM cache_entries WHERE cache = ?1 AND key = ?2",
                    rusqlite::params![cache, key],
                )?;
                Ok(())
            })
            .await
            .map_err(sqlite_error("evict cache entry"))
    }
}
