use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::AgentMonitor;
use crate::domain::{AgentKey, RequestType};
use crate::error::AppResult;
use crate::ports::AgentControl;

/// Action executed by the owning controller for one drained request.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the action fails against the live agent.
    async fn handle(&self, key: &AgentKey, control: Arc<dyn AgentControl>) -> AppResult<()>;
}

pub struct StopAgentHandler;

#[async_trait]
impl RequestHandler for StopAgentHandler {
    async fn handle(&self, _key: &AgentKey, control: Arc<dyn AgentControl>) -> AppResult<()> {
        control.stop().await
    }
}

/// Starts polling the agent for system snapshots.
pub struct ShareSystemDataHandler {
    monitor: Arc<AgentMonitor>,
}

impl ShareSystemDataHandler {
    #[must_use]
    pub const fn new(monitor: Arc<AgentMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl RequestHandler for ShareSystemDataHandler {
    async fn handle(&self, key: &AgentKey, _control: Arc<dyn AgentControl>) -> AppResult<()> {
        self.monitor.register(key).await
    }
}

/// Lookup table from request type to its handler.
#[derive(Default, Clone)]
pub struct RequestHandlers {
    handlers: BTreeMap<RequestType, Arc<dyn RequestHandler>>,
}

impl RequestHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with a handler for every request type.
    #[must_use]
    pub fn with_defaults(monitor: Arc<AgentMonitor>) -> Self {
        let mut handlers = Self::new();
        handlers.insert(RequestType::StopAgent, Arc::new(StopAgentHandler));
        handlers.insert(
            RequestType::ShareSystemData,
            Arc::new(ShareSystemDataHandler::new(monitor)),
        );
        handlers
    }

    pub fn insert(&mut self, request_type: RequestType, handler: Arc<dyn RequestHandler>) {
        self.handlers.insert(request_type, handler);
    }

    #[must_use]
    pub fn get(&self, request_type: RequestType) -> Option<Arc<dyn RequestHandler>> {
        self.handlers.get(&request_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cluster::test_support::FakeControl;
    use crate::domain::SystemSnapshot;
    use crate::error::AppError;
    use crate::store::MemoryCache;

    fn monitor() -> Arc<AgentMonitor> {
        Arc::new(AgentMonitor::new(
            Arc::new(MemoryCache::new("targets")),
            Arc::new(MemoryCache::new("snapshots")),
            Duration::from_secs(60),
            Duration::from_secs(300),
        ))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn defaults_cover_every_request_type() -> AppResult<()> {
        let handlers = RequestHandlers::with_defaults(monitor());
        for request_type in [RequestType::StopAgent, RequestType::ShareSystemData] {
            if handlers.get(request_type).is_none() {
                return Err(AppError::validation(format!(
                    "Missing handler for {}",
                    request_type
                )));
            }
        }
        if RequestHandlers::new().get(RequestType::StopAgent).is_some() {
            return Err(AppError::validation("Expected empty table"));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn stop_handler_stops_agent() -> AppResult<()> {
        let control = Arc::new(FakeControl::new(SystemSnapshot::default()));
        StopAgentHandler
            .handle(&AgentKey::new("10.0.0.1", "a"), control.clone())
            .await?;
        if control.stop_count() != 1 {
            return Err(AppError::validation("Expected one stop"));
        }
        Ok(())
    }

    #[tokio::test(flavor = "current_thread")]
    async fn share_handler_registers_monitoring_target() -> AppResult<()> {
        let monitor = monitor();
        let key = AgentKey::new("10.0.0.1", "a");
        ShareSystemDataHandler::new(monitor.clone())
            .handle(&key, Arc::new(FakeControl::new(SystemSnapshot::default())))
            .await?;
        if monitor.targets().await? != vec![key] {
            return Err(AppError::validation("Expected registered target"));
        }
        Ok(())
    }
}
