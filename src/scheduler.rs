//! Named periodic tasks with an explicit start/stop lifecycle.
//!
//! Each task runs on its own interval. A tick is awaited to completion
//! before the next one is scheduled, so ticks of one task never overlap; a
//! slow tick pushes the next one back instead of causing a burst
//! (`MissedTickBehavior::Delay`). Different tasks are independent and may
//! interleave freely.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::shutdown::{ShutdownReceiver, ShutdownSender, shutdown_channel};

#[async_trait]
pub trait PeriodicTask: Send + Sync {
    /// Runs one tick. Errors are logged by the scheduler and the task keeps
    /// its schedule; the next tick is the retry.
    ///
    /// # Errors
    ///
    /// Returns an error when the tick could not complete.
    async fn tick(&self) -> AppResult<()>;
}

struct ScheduledTask {
    name: &'static str,
    period: Duration,
    task: Arc<dyn PeriodicTask>,
}

pub struct Scheduler {
    pending: Vec<ScheduledTask>,
    names: Vec<&'static str>,
    shutdown_tx: ShutdownSender,
    handles: Vec<JoinHandle<()>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = shutdown_channel();
        Self::with_shutdown(&shutdown_tx)
    }

    /// Scheduler whose tasks also stop when `shutdown_tx` fires.
    #[must_use]
    pub fn with_shutdown(shutdown_tx: &ShutdownSender) -> Self {
        Self {
            pending: Vec::new(),
            names: Vec::new(),
            shutdown_tx: shutdown_tx.clone(),
            handles: Vec::new(),
        }
    }

    /// Registers a task. Duplicate names are skipped with a warning.
    pub fn register(&mut self, name: &'static str, period: Duration, task: Arc<dyn PeriodicTask>) {
        if self.names.contains(&name) {
            warn!("Skipping duplicate scheduled task: {}", name);
            return;
        }
        self.names.push(name);
        self.pending.push(ScheduledTask { name, period, task });
    }

    #[must_use]
    pub fn task_names(&self) -> &[&'static str] {
        &self.names
    }

    /// Spawns every registered task that is not running yet.
    pub fn start(&mut self) {
        for scheduled in self.pending.drain(..) {
            info!(
                "Starting task {} (every {}ms)",
                scheduled.name,
                scheduled.period.as_millis()
            );
            let shutdown_rx = self.shutdown_tx.subscribe();
            self.handles.push(tokio::spawn(run_task(scheduled, shutdown_rx)));
        }
    }

    /// Signals every task to stop and waits for in-flight ticks to finish.
    ///
    /// # Errors
    ///
    /// Returns an error when a task panicked.
    pub async fn shutdown(self) -> AppResult<()> {
        drop(self.shutdown_tx.send(()));
        for handle in self.handles {
            handle.await?;
        }
        Ok(())
    }
}

async fn run_task(scheduled: ScheduledTask, mut shutdown_rx: ShutdownReceiver) {
    let ScheduledTask { name, period, task } = scheduled;
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {}
        }
        if let Err(err) = task.tick().await {
            warn!("Task {} tick failed: {}", name, err);
        }
    }
    debug!("Task {} stopped", name);
}
