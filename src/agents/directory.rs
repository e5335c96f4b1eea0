use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::domain::{AgentKey, AgentStatus, LiveAgent};
use crate::ports::{AgentControl, LiveAgentDirectory};

struct AttachedAgent {
    live: LiveAgent,
    control: Arc<dyn AgentControl>,
    connection: u64,
}

/// Agents connected to this controller process right now.
///
/// Every attach gets a connection id; detach and status updates only apply
/// when the id still matches, so a stale connection closing late cannot
/// remove the agent's newer connection.
#[derive(Default)]
pub struct LocalAgentDirectory {
    agents: RwLock<HashMap<AgentKey, AttachedAgent>>,
    next_connection: AtomicU64,
}

impl LocalAgentDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an agent, replacing any previous connection for the same key.
    pub async fn attach(&self, live: LiveAgent, control: Arc<dyn AgentControl>) -> u64 {
        let connection = self
            .next_connection
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1);
        let key = live.key.clone();
        info!(
            "Agent {} attached (port={}, region={}, status={})",
            key, live.port, live.region, live.status
        );
        let previous = self.agents.write().await.insert(
            key.clone(),
            AttachedAgent {
                live,
                control,
                connection,
            },
        );
        if previous.is_some() {
            warn!("Agent {} reconnected; replaced previous connection", key);
        }
        connection
    }

    /// Returns `false` when the connection was already replaced or removed.
    pub async fn detach(&self, key: &AgentKey, connection: u64) -> bool {
        let mut agents = self.agents.write().await;
        if agents
            .get(key)
            .is_none_or(|attached| attached.connection != connection)
        {
            return false;
        }
        agents.remove(key);
        info!("Agent {} detached", key);
        true
    }

    pub async fn set_status(&self, key: &AgentKey, connection: u64, status: AgentStatus) -> bool {
        let mut agents = self.agents.write().await;
        match agents.get_mut(key) {
            Some(attached) if attached.connection == connection => {
                attached.live.status = status;
                true
            }
            Some(_) | None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}

#[async_trait]
impl LiveAgentDirectory for LocalAgentDirectory {
    async fn attached(&self) -> Vec<LiveAgent> {
        let mut agents: Vec<LiveAgent> = self
            .agents
            .read()
            .await
            .values()
            .map(|attached| attached.live.clone())
            .collect();
        agents.sort_by(|left, right| left.key.cmp(&right.key));
        agents
    }

    async fn control(&self, key: &AgentKey) -> Option<Arc<dyn AgentControl>> {
        self.agents
            .read()
            .await
            .get(key)
            .map(|attached| attached.control.clone())
    }
}
