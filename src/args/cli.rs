use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use super::parsers::{parse_bool_env, parse_duration_arg};

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the controller (default)
    Run,
    /// List agent records
    List(ListArgs),
    /// Ask the controller serving the agent's region to stop it
    Stop(AgentIdArgs),
    /// Ask the controller serving the agent's region to start sharing its system data
    Share(AgentIdArgs),
    /// Print the last system snapshot collected for an agent
    Snapshot(SnapshotArgs),
    /// Print how many agents a user can run tests on, per region
    Capacity(CapacityArgs),
}

#[derive(Debug, Args, Clone, PartialEq, Eq)]
pub struct ListArgs {
    /// Include agents of every region, not only the local one
    #[arg(long = "all")]
    pub all: bool,
}

#[derive(Debug, Args, Clone, PartialEq, Eq)]
pub struct AgentIdArgs {
    /// Agent record id
    #[arg(long = "id")]
    pub id: i64,
}

#[derive(Debug, Args, Clone, PartialEq, Eq)]
pub struct SnapshotArgs {
    /// Agent IP address
    #[arg(long = "ip")]
    pub ip: String,

    /// Agent name
    #[arg(long = "name")]
    pub name: String,
}

#[derive(Debug, Args, Clone, PartialEq, Eq)]
pub struct CapacityArgs {
    /// User id whose owned agents are counted
    #[arg(long = "user")]
    pub user: String,
}

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Cluster controller for strest load agents - region-aware agent registry, cross-controller commands over a shared cache, and per-user capacity accounting."
)]
pub struct ClusterArgs {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to config file (TOML/JSON). Defaults to strest-cluster.toml or strest-cluster.json when present
    #[arg(long = "config", env = "STREST_CLUSTER_CONFIG")]
    pub config: Option<String>,

    /// Region served by this controller
    #[arg(long = "region", env = "STREST_CLUSTER_REGION")]
    pub region: Option<String>,

    /// Known regions of the cluster (comma-separated, repeatable)
    #[arg(long = "regions", value_delimiter = ',')]
    pub regions: Vec<String>,

    /// SQLite database shared by every controller of the cluster
    #[arg(long = "database", default_value = "strest-cluster.db")]
    pub database: String,

    /// Address agents connect to
    #[arg(long = "agent-listen", default_value = "0.0.0.0:16001")]
    pub agent_listen: String,

    /// Maximum shared-pool agents a console may use per region
    #[arg(long = "max-agents-per-console", default_value_t = 10)]
    pub max_agents_per_console: usize,

    /// Reconciliation period (supports ms/s/m/h)
    #[arg(long = "reconcile-interval", default_value = "1s", value_parser = parse_duration_arg)]
    pub reconcile_interval: Duration,

    /// Request bus drain period (supports ms/s/m/h)
    #[arg(long = "drain-interval", default_value = "3s", value_parser = parse_duration_arg)]
    pub drain_interval: Duration,

    /// Monitoring poll period (supports ms/s/m/h)
    #[arg(long = "poll-interval", default_value = "1s", value_parser = parse_duration_arg)]
    pub poll_interval: Duration,

    /// Region announcement period (supports ms/s/m/h)
    #[arg(long = "region-announce-interval", default_value = "10s", value_parser = parse_duration_arg)]
    pub region_announce_interval: Duration,

    /// Lifetime of a posted request (supports ms/s/m/h)
    #[arg(long = "request-ttl", default_value = "10s", value_parser = parse_duration_arg)]
    pub request_ttl: Duration,

    /// How long an agent stays polled after it was last asked to share data
    #[arg(long = "monitoring-target-ttl", default_value = "60s", value_parser = parse_duration_arg)]
    pub monitoring_target_ttl: Duration,

    /// Lifetime of a cached system snapshot (supports ms/s/m/h)
    #[arg(long = "snapshot-ttl", default_value = "5m", value_parser = parse_duration_arg)]
    pub snapshot_ttl: Duration,

    /// Lifetime of a region announcement (supports ms/s/m/h)
    #[arg(long = "region-ttl", default_value = "30s", value_parser = parse_duration_arg)]
    pub region_ttl: Duration,

    /// How long to wait for an agent to answer a snapshot request
    #[arg(long = "snapshot-timeout", default_value = "2s", value_parser = parse_duration_arg)]
    pub snapshot_timeout: Duration,

    /// Enable debug logging (or set STREST_CLUSTER_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color", env = "NO_COLOR", value_parser = parse_bool_env)]
    pub no_color: bool,
}
