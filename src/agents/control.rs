use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::timeout;

use super::protocol::{SnapshotRequestMessage, WireMessage};
use crate::domain::{AgentKey, SystemSnapshot};
use crate::error::{AgentError, AppError, AppResult};
use crate::ports::AgentControl;

/// Control handle over one agent's TCP connection.
///
/// Outgoing messages go through the connection's writer task; snapshot
/// replies are matched to their request by id.
pub struct ConnectionControl {
    agent: String,
    sender: mpsc::UnboundedSender<WireMessage>,
    pending: Mutex<HashMap<u64, oneshot::Sender<SystemSnapshot>>>,
    next_request_id: AtomicU64,
    snapshot_timeout: Duration,
}

impl ConnectionControl {
    #[must_use]
    pub fn new(
        key: &AgentKey,
        sender: mpsc::UnboundedSender<WireMessage>,
        snapshot_timeout: Duration,
    ) -> Self {
        Self {
            agent: key.to_string(),
            sender,
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(1),
            snapshot_timeout,
        }
    }

    /// Hands a snapshot reply to the caller waiting for it. Returns `false`
    /// for replies nobody waits for anymore.
    pub async fn complete_snapshot(&self, request_id: u64, snapshot: SystemSnapshot) -> bool {
        let waiter = self.pending.lock().await.remove(&request_id);
        waiter.is_some_and(|waiter| waiter.send(snapshot).is_ok())
    }

    /// Fails every outstanding snapshot request.
    pub async fn close(&self) {
        self.pending.lock().await.clear();
    }

    fn send(&self, message: WireMessage) -> AppResult<()> {
        self.sender.send(message).map_err(|_err| {
            AppError::agent(AgentError::ChannelClosed {
                agent: self.agent.clone(),
            })
        })
    }
}

#[async_trait]
impl AgentControl for ConnectionControl {
    async fn stop(&self) -> AppResult<()> {
        self.send(WireMessage::Stop)
    }

    async fn fetch_system_snapshot(&self) -> AppResult<SystemSnapshot> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(request_id, reply_tx);

        if let Err(err) = self.send(WireMessage::SnapshotRequest(SnapshotRequestMessage {
            request_id,
        })) {
            self.pending.lock().await.remove(&request_id);
            return Err(err);
        }

        match timeout(self.snapshot_timeout, reply_rx).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(_closed)) => Err(AppError::agent(AgentError::ChannelClosed {
                agent: self.agent.clone(),
            })),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&request_id);
                Err(AppError::agent(AgentError::SnapshotTimeout {
                    agent: self.agent.clone(),
                }))
            }
        }
    }
}
