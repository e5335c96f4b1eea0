use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::RequestHandlers;
use crate::domain::{
    AgentKey, ClusterRequest, RequestType, request_cache_key, request_key_region,
};
use crate::error::AppResult;
use crate::ports::{LiveAgentDirectory, SharedCache, get_json, put_json};
use crate::scheduler::PeriodicTask;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainOutcome {
    pub processed: usize,
    /// Requests whose agent is not attached here, or with no handler.
    pub dropped: usize,
    pub failed: usize,
}

enum Delivery {
    Processed,
    Dropped,
}

/// Cross-controller command delivery over a TTL cache.
///
/// Requests are keyed `"<region>|<ip>_<name>"`. Only controllers serving
/// that region drain them, and every drained key is evicted whether or not
/// the action succeeded, so delivery is at most once.
pub struct RequestBus {
    local_region: String,
    cache: Arc<dyn SharedCache>,
    ttl: Duration,
}

impl RequestBus {
    #[must_use]
    pub fn new(local_region: impl Into<String>, cache: Arc<dyn SharedCache>, ttl: Duration) -> Self {
        Self {
            local_region: local_region.into(),
            cache,
            ttl,
        }
    }

    /// Posts a request for the controller serving `target_region`.
    ///
    /// Returns `false` when the cache rejected the write; the request is
    /// then lost and callers decide whether to retry.
    pub async fn enqueue(
        &self,
        target_region: &str,
        key: &AgentKey,
        request_type: RequestType,
    ) -> bool {
        let cache_key = request_cache_key(target_region, key);
        let request = ClusterRequest::new(key, request_type);
        match put_json(self.cache.as_ref(), &cache_key, &request, self.ttl).await {
            Ok(()) => {
                debug!("Enqueued {} for {}", request_type, cache_key);
                true
            }
            Err(err) => {
                warn!(
                    "Failed to enqueue {} for {} on {}: {}",
                    request_type,
                    cache_key,
                    self.cache.name(),
                    err
                );
                false
            }
        }
    }

    /// Executes and evicts every pending request addressed to this region.
    ///
    /// # Errors
    ///
    /// Returns an error only when the pending keys cannot be listed;
    /// failures of single requests are logged and counted.
    pub async fn drain(
        &self,
        directory: &dyn LiveAgentDirectory,
        handlers: &RequestHandlers,
    ) -> AppResult<DrainOutcome> {
        let mut outcome = DrainOutcome::default();
        let pending = self
            .cache
            .live_keys()
            .await?
            .into_iter()
            .filter(|cache_key| request_key_region(cache_key) == Some(self.local_region.as_str()));

        for cache_key in pending {
            let delivery = self.deliver(&cache_key, directory, handlers).await;
            if let Err(err) = self.cache.evict(&cache_key).await {
                warn!("Failed to evict request {}: {}", cache_key, err);
            }
            match delivery {
                Ok(Delivery::Processed) => outcome.processed = outcome.processed.saturating_add(1),
                Ok(Delivery::Dropped) => outcome.dropped = outcome.dropped.saturating_add(1),
                Err(err) => {
                    warn!("Request {} failed: {}", cache_key, err);
                    outcome.failed = outcome.failed.saturating_add(1);
                }
            }
        }
        Ok(outcome)
    }

    async fn deliver(
        &self,
        cache_key: &str,
        directory: &dyn LiveAgentDirectory,
        handlers: &RequestHandlers,
    ) -> AppResult<Delivery> {
        let Some(request) = get_json::<ClusterRequest>(self.cache.as_ref(), cache_key).await?
        else {
            return Ok(Delivery::Dropped);
        };
        let key = request.agent_key();
        let Some(control) = directory.control(&key).await else {
            debug!(
                "Dropping {} for {}: agent not attached here",
                request.request_type, key
            );
            return Ok(Delivery::Dropped);
        };
        let Some(handler) = handlers.get(request.request_type) else {
            warn!("No handler for {}; dropping request", request.request_type);
            return Ok(Delivery::Dropped);
        };
        handler.handle(&key, control).await?;
        info!("Processed {} for agent {}", request.request_type, key);
        Ok(Delivery::Processed)
    }
}

/// Periodic drain of the request bus for this controller's region.
pub struct RequestDrain {
    bus: Arc<RequestBus>,
    directory: Arc<dyn LiveAgentDirectory>,
    handlers: RequestHandlers,
}

impl RequestDrain {
    #[must_use]
    pub const fn new(
        bus: Arc<RequestBus>,
        directory: Arc<dyn LiveAgentDirectory>,
        handlers: RequestHandlers,
    ) -> Self {
        Self {
            bus,
            directory,
            handlers,
        }
    }
}

#[async_trait]
impl PeriodicTask for RequestDrain {
    async fn tick(&self) -> AppResult<()> {
        self.bus
            .drain(self.directory.as_ref(), &self.handlers)
            .await
            .map(drop)
    }
}
