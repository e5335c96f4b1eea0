use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AppResult;
use crate::ports::SharedCache;

struct CacheEntry {
    value: String,
    /// `None` when the TTL overflowed the clock, i.e. never expires.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Process-local TTL cache driven by the tokio clock.
pub struct MemoryCache {
    name: String,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SharedCache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> AppResult<()> {
        let expires_at = Instant::now().checked_add(ttl);
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_owned(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn live_keys(&self) -> AppResult<Vec<String>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.is_live(now));
        Ok(entries.keys().cloned().collect())
    }

    async fn evict(&self, key: &str) -> AppResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
