use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{AgentKey, SystemSnapshot};
use crate::error::AppResult;
use crate::ports::{LiveAgentDirectory, SharedCache, get_json, put_json};
use crate::scheduler::PeriodicTask;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    pub collected: usize,
    /// Targets registered here but no longer attached.
    pub skipped: usize,
    pub failed: usize,
}

/// Monitoring target registry plus the snapshot cache it feeds.
///
/// Targets live in a TTL cache: an agent stays polled only while someone
/// keeps asking for its data. Snapshots go to a cache shared by all
/// controllers so any of them can serve `snapshot`.
pub struct AgentMonitor {
    targets: Arc<dyn SharedCache>,
    snapshots: Arc<dyn SharedCache>,
    target_ttl: Duration,
    snapshot_ttl: Duration,
}

impl AgentMonitor {
    #[must_use]
    pub const fn new(
        targets: Arc<dyn SharedCache>,
        snapshots: Arc<dyn SharedCache>,
        target_ttl: Duration,
        snapshot_ttl: Duration,
    ) -> Self {
        Self {
            targets,
            snapshots,
            target_ttl,
            snapshot_ttl,
        }
    }

    /// Registers (or refreshes) an agent for polling.
    ///
    /// # Errors
    ///
    /// Returns an error when the target cache is unreachable.
    pub async fn register(&self, key: &AgentKey) -> AppResult<()> {
        put_json(self.targets.as_ref(), &key.to_string(), key, self.target_ttl).await?;
        debug!("Registered monitoring target {}", key);
        Ok(())
    }

    /// Targets whose registration has not expired, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns an error when the target cache is unreachable.
    pub async fn targets(&self) -> AppResult<Vec<AgentKey>> {
        let mut targets = Vec::new();
        for cache_key in self.targets.live_keys().await? {
            match get_json::<AgentKey>(self.targets.as_ref(), &cache_key).await {
                Ok(Some(key)) => targets.push(key),
                // Expired between listing and reading.
                Ok(None) => {}
                Err(err) => warn!("Skipping monitoring target {}: {}", cache_key, err),
            }
        }
        targets.sort();
        Ok(targets)
    }

    /// Fetches a fresh snapshot from every attached target, concurrently.
    ///
    /// # Errors
    ///
    /// Returns an error when the target cache is unreachable.
    pub async fn poll(&self, directory: &dyn LiveAgentDirectory) -> AppResult<PollOutcome> {
        let mut outcome = PollOutcome::default();
        let mut fetches = JoinSet::new();
        for key in self.targets().await? {
            let Some(control) = directory.control(&key).await else {
                outcome.skipped = outcome.skipped.saturating_add(1);
                continue;
            };
            fetches.spawn(async move {
                let result = control.fetch_system_snapshot().await;
                (key, result)
            });
        }

        while let Some(joined) = fetches.join_next().await {
            let (key, result) = match joined {
                Ok(pair) => pair,
                Err(err) => {
                    warn!("Snapshot fetch task failed: {}", err);
                    outcome.failed = outcome.failed.saturating_add(1);
                    continue;
                }
            };
            let stored = match result {
                Ok(snapshot) => {
                    put_json(
                        self.snapshots.as_ref(),
                        &key.to_string(),
                        &snapshot,
                        self.snapshot_ttl,
                    )
                    .await
                }
                Err(err) => Err(err),
            };
            match stored {
                Ok(()) => outcome.collected = outcome.collected.saturating_add(1),
                Err(err) => {
                    warn!("Failed to collect snapshot from {}: {}", key, err);
                    outcome.failed = outcome.failed.saturating_add(1);
                }
            }
        }
        Ok(outcome)
    }

    /// Last cached snapshot for the agent, or an empty one.
    pub async fn snapshot(&self, key: &AgentKey) -> SystemSnapshot {
        match get_json::<SystemSnapshot>(self.snapshots.as_ref(), &key.to_string()).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => SystemSnapshot::default(),
            Err(err) => {
                warn!("Unable to read snapshot for {}: {}", key, err);
                SystemSnapshot::default()
            }
        }
    }
}

/// Periodic snapshot collection for this controller's attached agents.
pub struct MonitorPoll {
    monitor: Arc<AgentMonitor>,
    directory: Arc<dyn LiveAgentDirectory>,
}

impl MonitorPoll {
    #[must_use]
    pub const fn new(monitor: Arc<AgentMonitor>, directory: Arc<dyn LiveAgentDirectory>) -> Self {
        Self { monitor, directory }
    }
}

#[async_trait]
impl PeriodicTask for MonitorPoll {
    async fn tick(&self) -> AppResult<()> {
        let outcome = self.monitor.poll(self.directory.as_ref()).await?;
        if outcome != PollOutcome::default() {
            debug!(
                "Polled monitoring targets (collected={}, skipped={}, failed={})",
                outcome.collected, outcome.skipped, outcome.failed
            );
        }
        Ok(())
    }
}
