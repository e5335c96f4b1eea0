use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use super::{AgentMonitor, CapacityAccountant, RequestBus};
use crate::domain::{AgentKey, AgentRecord, RequestType, SystemSnapshot};
use crate::error::AppResult;
use crate::ports::AgentRegistry;

/// Operations offered to the console layer on top of the cluster core.
pub struct ClusterAgentManager {
    local_region: String,
    registry: Arc<dyn AgentRegistry>,
    bus: Arc<RequestBus>,
    monitor: Arc<AgentMonitor>,
    capacity: CapacityAccountant,
}

impl ClusterAgentManager {
    #[must_use]
    pub fn new(
        local_region: impl Into<String>,
        registry: Arc<dyn AgentRegistry>,
        bus: Arc<RequestBus>,
        monitor: Arc<AgentMonitor>,
        capacity: CapacityAccountant,
    ) -> Self {
        Self {
            local_region: local_region.into(),
            registry,
            bus,
            monitor,
            capacity,
        }
    }

    /// Asks the controller serving the agent's region to stop it.
    ///
    /// Returns `false` when no record has this id or the request could not
    /// be posted.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry is unreachable.
    pub async fn stop_agent_by_id(&self, id: i64) -> AppResult<bool> {
        self.request_by_id(id, RequestType::StopAgent).await
    }

    /// Asks the controller serving the agent's region to start polling it.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry is unreachable.
    pub async fn request_share_monitoring(&self, id: i64) -> AppResult<bool> {
        self.request_by_id(id, RequestType::ShareSystemData).await
    }

    async fn request_by_id(&self, id: i64, request_type: RequestType) -> AppResult<bool> {
        let Some(record) = self.registry.find_by_id(id).await? else {
            info!("No agent with id {}; {} not sent", id, request_type);
            return Ok(false);
        };
        Ok(self
            .bus
            .enqueue(record.bare_region(), &record.key(), request_type)
            .await)
    }

    pub async fn snapshot(&self, ip: &str, name: &str) -> SystemSnapshot {
        self.monitor.snapshot(&AgentKey::new(ip, name)).await
    }

    /// # Errors
    ///
    /// Returns an error when the registry or region directory is unreachable.
    pub async fn available_agents(&self, user_id: &str) -> AppResult<BTreeMap<String, usize>> {
        self.capacity.available_agents(user_id).await
    }

    /// Records whose bare region is the one this controller serves.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry is unreachable.
    pub async fn local_agent_records(&self) -> AppResult<Vec<AgentRecord>> {
        let mut records = self
            .registry
            .find_by_region_prefix(&self.local_region)
            .await?;
        records.retain(|record| record.bare_region() == self.local_region);
        Ok(records)
    }

    /// Every record in the registry, whatever its region.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry is unreachable.
    pub async fn all_agent_records(&self) -> AppResult<Vec<AgentRecord>> {
        self.registry.find_all().await
    }
}
