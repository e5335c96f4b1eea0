//! Process wiring: stores, caches, agent listener and the periodic tasks.
use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::{AgentListener, LocalAgentDirectory};
use crate::cluster::{
    AgentMonitor, CapacityAccountant, ClusterAgentManager, MonitorPoll, Reconciler, RequestBus,
    RequestDrain, RequestHandlers,
};
use crate::config::ControllerSettings;
use crate::error::AppResult;
use crate::ports::{AgentRegistry, SharedCache};
use crate::scheduler::Scheduler;
use crate::shutdown::ShutdownSender;
use crate::store::{
    AGENT_MONITORING_CACHE, AGENT_MONITORING_TARGETS_CACHE, AGENT_REQUEST_CACHE, AnnouncedRegions,
    MemoryCache, REGIONS_CACHE, SqliteAgentRegistry, SqliteCache, open_database,
};

pub const RECONCILE_TASK: &str = "reconcile";
pub const REQUEST_DRAIN_TASK: &str = "request-drain";
pub const MONITOR_POLL_TASK: &str = "monitor-poll";
pub const REGION_ANNOUNCE_TASK: &str = "region-announce";

/// Backing stores shared with the other controllers of the cluster.
pub struct SharedStores {
    pub registry: Arc<dyn AgentRegistry>,
    pub requests: Arc<dyn SharedCache>,
    pub snapshots: Arc<dyn SharedCache>,
    pub regions: Arc<dyn SharedCache>,
}

impl SharedStores {
    /// Opens the SQLite database at `settings.database`.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened or initialized.
    pub async fn open(settings: &ControllerSettings) -> AppResult<Self> {
        let conn = open_database(&settings.database).await?;
        Ok(Self {
            registry: Arc::new(SqliteAgentRegistry::new(conn.clone())),
            requests: Arc::new(SqliteCache::new(conn.clone(), AGENT_REQUEST_CACHE)),
            snapshots: Arc::new(SqliteCache::new(conn.clone(), AGENT_MONITORING_CACHE)),
            regions: Arc::new(SqliteCache::new(conn, REGIONS_CACHE)),
        })
    }
}

/// One controller node.
pub struct Controller {
    settings: ControllerSettings,
    registry: Arc<dyn AgentRegistry>,
    regions: Arc<AnnouncedRegions>,
    directory: Arc<LocalAgentDirectory>,
    monitor: Arc<AgentMonitor>,
    bus: Arc<RequestBus>,
}

impl Controller {
    #[must_use]
    pub fn new(settings: ControllerSettings, stores: SharedStores) -> Self {
        let intervals = settings.intervals;
        let regions = Arc::new(AnnouncedRegions::new(
            settings.region.clone(),
            settings.regions.clone(),
            stores.regions,
            intervals.region_ttl,
        ));
        let monitor = Arc::new(AgentMonitor::new(
            Arc::new(MemoryCache::new(AGENT_MONITORING_TARGETS_CACHE)),
            stores.snapshots,
            intervals.monitoring_target_ttl,
            intervals.snapshot_ttl,
        ));
        let bus = Arc::new(RequestBus::new(
            settings.region.clone(),
            stores.requests,
            intervals.request_ttl,
        ));
        Self {
            settings,
            registry: stores.registry,
            regions,
            directory: Arc::new(LocalAgentDirectory::new()),
            monitor,
            bus,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    #[must_use]
    pub fn directory(&self) -> Arc<LocalAgentDirectory> {
        self.directory.clone()
    }

    #[must_use]
    pub fn regions(&self) -> Arc<AnnouncedRegions> {
        self.regions.clone()
    }

    #[must_use]
    pub fn manager(&self) -> ClusterAgentManager {
        let capacity = CapacityAccountant::new(
            self.settings.region.clone(),
            self.settings.max_agents_per_console,
            self.registry.clone(),
            self.regions.clone(),
        );
        ClusterAgentManager::new(
            self.settings.region.clone(),
            self.registry.clone(),
            self.bus.clone(),
            self.monitor.clone(),
            capacity,
        )
    }

    #[must_use]
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.settings.region.clone(),
            self.registry.clone(),
            self.directory.clone(),
            self.regions.clone(),
        )
    }

    #[must_use]
    pub fn request_drain(&self) -> RequestDrain {
        RequestDrain::new(
            self.bus.clone(),
            self.directory.clone(),
            RequestHandlers::with_defaults(self.monitor.clone()),
        )
    }

    #[must_use]
    pub fn monitor_poll(&self) -> MonitorPoll {
        MonitorPoll::new(self.monitor.clone(), self.directory.clone())
    }

    /// Scheduler with the controller's four periodic tasks registered.
    #[must_use]
    pub fn scheduler(&self, shutdown_tx: &ShutdownSender) -> Scheduler {
        let intervals = self.settings.intervals;
        let mut scheduler = Scheduler::with_shutdown(shutdown_tx);
        scheduler.register(
            RECONCILE_TASK,
            intervals.reconcile,
            Arc::new(self.reconciler()),
        );
        scheduler.register(
            REQUEST_DRAIN_TASK,
            intervals.drain,
            Arc::new(self.request_drain()),
        );
        scheduler.register(
            MONITOR_POLL_TASK,
            intervals.poll,
            Arc::new(self.monitor_poll()),
        );
        scheduler.register(
            REGION_ANNOUNCE_TASK,
            intervals.region_announce,
            self.regions.clone(),
        );
        scheduler
    }

    /// Serves agents and runs the periodic tasks until `shutdown_tx` fires.
    ///
    /// # Errors
    ///
    /// Returns an error when the agent listener cannot be bound or a task
    /// panicked.
    pub async fn run(self, shutdown_tx: &ShutdownSender) -> AppResult<()> {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let listener = AgentListener::bind(
            self.settings.agent_listen,
            self.directory.clone(),
            self.settings.intervals.snapshot_timeout,
        )
        .await?;
        let listener_task = tokio::spawn(listener.serve(shutdown_tx.subscribe()));

        // Join the cluster before the first reconciliation reads the region set.
        if let Err(err) = self.regions.announce().await {
            warn!("Initial region announcement failed: {}", err);
        }
        let mut scheduler = self.scheduler(shutdown_tx);
        scheduler.start();
        info!(
            "Controller for region {} running (known regions: {})",
            self.settings.region,
            self.settings.regions.join(", ")
        );

        drop(shutdown_rx.recv().await);
        info!("Shutting down controller");
        scheduler.shutdown().await?;
        listener_task.await?;
        Ok(())
    }
}
