//! Concrete adapters for the cluster ports.
//!
//! SQLite-backed stores share one database file between controller
//! processes; the in-memory variants back process-local caches and tests.
mod memory_cache;
mod memory_registry;
mod regions;
mod sqlite;
mod sqlite_cache;
mod sqlite_registry;

pub use memory_cache::MemoryCache;
pub use memory_registry::MemoryAgentRegistry;
pub use regions::{AnnouncedRegions, StaticRegions};
pub use sqlite::open_database;
pub use sqlite_cache::SqliteCache;
pub use sqlite_registry::SqliteAgentRegistry;

/// Cache carrying cross-controller agent requests.
pub const AGENT_REQUEST_CACHE: &str = "agent_request";
/// Cache holding the latest system snapshot per agent.
pub const AGENT_MONITORING_CACHE: &str = "agent_monitoring";
/// Process-local cache of agents to poll for snapshots.
pub const AGENT_MONITORING_TARGETS_CACHE: &str = "agent_monitoring_targets";
/// Cache where controllers announce the region they serve.
pub const REGIONS_CACHE: &str = "regions";
