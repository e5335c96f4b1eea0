use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{AgentKey, AgentRecord, AgentRegion, AgentStatus, LiveAgent, SystemSnapshot};
use crate::error::{AppError, AppResult};
use crate::ports::{AgentControl, LiveAgentDirectory};

pub(super) fn live(ip: &str, name: &str, port: u16, region: &str) -> LiveAgent {
    LiveAgent {
        key: AgentKey::new(ip, name),
        port,
        status: AgentStatus::Ready,
        region: AgentRegion::parse(region),
    }
}

pub(super) fn record(ip: &str, name: &str, port: u16, region: &str) -> AgentRecord {
    AgentRecord {
        id: None,
        ip: ip.to_owned(),
        name: name.to_owned(),
        port,
        region: AgentRegion::parse(region),
        status: AgentStatus::Ready,
        approved: false,
        version: 0,
    }
}

pub(super) struct FakeControl {
    stops: AtomicUsize,
    snapshot: SystemSnapshot,
    fail: bool,
}

impl FakeControl {
    pub(super) const fn new(snapshot: SystemSnapshot) -> Self {
        Self {
            stops: AtomicUsize::new(0),
            snapshot,
            fail: false,
        }
    }

    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(SystemSnapshot::default())
        }
    }

    pub(super) fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentControl for FakeControl {
    async fn stop(&self) -> AppResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::agent("stop failed"));
        }
        Ok(())
    }

    async fn fetch_system_snapshot(&self) -> AppResult<SystemSnapshot> {
        if self.fail {
            return Err(AppError::agent("snapshot failed"));
        }
        Ok(self.snapshot.clone())
    }
}

#[derive(Default)]
pub(super) struct FakeDirectory {
    agents: Mutex<HashMap<AgentKey, (LiveAgent, Arc<FakeControl>)>>,
}

impl FakeDirectory {
    pub(super) async fn attach(&self, agent: LiveAgent, control: Arc<FakeControl>) {
        self.agents
            .lock()
            .await
            .insert(agent.key.clone(), (agent, control));
    }

    pub(super) async fn detach(&self, key: &AgentKey) {
        self.agents.lock().await.remove(key);
    }
}

#[async_trait]
impl LiveAgentDirectory for FakeDirectory {
    async fn attached(&self) -> Vec<LiveAgent> {
        let mut agents: Vec<LiveAgent> = self
            .agents
            .lock()
            .await
            .values()
            .map(|(agent, _)| agent.clone())
            .collect();
        agents.sort_by(|left, right| left.key.cmp(&right.key));
        agents
    }

    async fn control(&self, key: &AgentKey) -> Option<Arc<dyn AgentControl>> {
        self.agents
            .lock()
            .await
            .get(key)
            .map(|(_, control)| control.clone() as Arc<dyn AgentControl>)
    }
}
