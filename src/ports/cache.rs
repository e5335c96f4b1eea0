use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult, StoreError};

/// Key/value store with per-key expiry, shared by every controller that
/// points at the same backing store.
///
/// Contract:
/// - an entry is visible to `get` and `live_keys` only until its TTL
///   elapses; expired entries behave exactly like absent ones;
/// - `put` overwrites unconditionally (last write wins) and restarts the TTL;
/// - `evict` of an absent key is not an error;
/// - consumers that treat entries as messages must evict after one read,
///   which together with the TTL gives at-most-once delivery.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Name of the logical cache, used in logs.
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error when the backing store is unreachable.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> AppResult<()>;

    /// # Errors
    ///
    /// Returns an error when the backing store is unreachable.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Keys whose TTL has not elapsed, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error when the backing store is unreachable.
    async fn live_keys(&self) -> AppResult<Vec<String>>;

    /// # Errors
    ///
    /// Returns an error when the backing store is unreachable.
    async fn evict(&self, key: &str) -> AppResult<()>;
}

/// Serializes `value` as JSON and stores it under `key`.
///
/// # Errors
///
/// Returns an error when serialization fails or the cache is unreachable.
pub async fn put_json<T>(
    cache: &dyn SharedCache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> AppResult<()>
where
    T: Serialize + Sync,
{
    let payload = serde_json::to_string(value).map_err(|err| {
        AppError::store(StoreError::Serialize {
            context: "encode cache value",
            source: err,
        })
    })?;
    cache.put(key, payload, ttl).await
}

/// Reads and decodes the JSON value stored under `key`.
///
/// # Errors
///
/// Returns an error when the cache is unreachable or the payload does not
/// decode as `T`.
pub async fn get_json<T>(cache: &dyn SharedCache, key: &str) -> AppResult<Option<T>>
where
    T: DeserializeOwned,
{
    let Some(payload) = cache.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&payload).map(Some).map_err(|err| {
        AppError::store(StoreError::Deserialize {
            key: key.to_owned(),
            source: err,
        })
    })
}
