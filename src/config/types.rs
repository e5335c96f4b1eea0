use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ValidationError;

/// Contents of `strest-cluster.toml` / `strest-cluster.json`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub region: Option<String>,
    pub regions: Option<Vec<String>>,
    pub database: Option<String>,
    pub agent_listen: Option<String>,
    pub max_agents_per_console: Option<usize>,
    pub intervals: Option<IntervalsConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IntervalsConfig {
    pub reconcile: Option<DurationValue>,
    pub drain: Option<DurationValue>,
    pub poll: Option<DurationValue>,
    pub region_announce: Option<DurationValue>,
    pub request_ttl: Option<DurationValue>,
    pub monitoring_target_ttl: Option<DurationValue>,
    pub snapshot_ttl: Option<DurationValue>,
    pub region_ttl: Option<DurationValue>,
    pub snapshot_timeout: Option<DurationValue>,
}

/// Either whole seconds or a `"<n>[ms|s|m|h]"` string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }
}

/// Timer periods and TTLs of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub reconcile: Duration,
    pub drain: Duration,
    pub poll: Duration,
    pub region_announce: Duration,
    /// Lifetime of a posted request; must outlive one drain period.
    pub request_ttl: Duration,
    pub monitoring_target_ttl: Duration,
    pub snapshot_ttl: Duration,
    pub region_ttl: Duration,
    pub snapshot_timeout: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            reconcile: Duration::from_secs(1),
            drain: Duration::from_secs(3),
            poll: Duration::from_secs(1),
            region_announce: Duration::from_secs(10),
            request_ttl: Duration::from_secs(10),
            monitoring_target_ttl: Duration::from_secs(60),
            snapshot_ttl: Duration::from_secs(300),
            region_ttl: Duration::from_secs(30),
            snapshot_timeout: Duration::from_secs(2),
        }
    }
}

/// Validated controller settings, CLI merged over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub region: String,
    /// Configured region set, always including `region`.
    pub regions: Vec<String>,
    pub database: String,
    pub agent_listen: SocketAddr,
    pub max_agents_per_console: usize,
    pub intervals: Intervals,
}
