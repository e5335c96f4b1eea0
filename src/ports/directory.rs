use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{AgentKey, LiveAgent, SystemSnapshot};
use crate::error::AppResult;

/// Agents currently connected to this controller process.
#[async_trait]
pub trait LiveAgentDirectory: Send + Sync {
    async fn attached(&self) -> Vec<LiveAgent>;

    /// Control handle for an attached agent, `None` once it has gone away.
    async fn control(&self, key: &AgentKey) -> Option<Arc<dyn AgentControl>>;
}

/// Command channel to one live agent.
#[async_trait]
pub trait AgentControl: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the agent connection is already closed.
    async fn stop(&self) -> AppResult<()>;

    /// # Errors
    ///
    /// Returns an error when the agent does not answer in time or the
    /// connection is closed.
    async fn fetch_system_snapshot(&self) -> AppResult<SystemSnapshot>;
}
