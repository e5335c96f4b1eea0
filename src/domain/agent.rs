use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::region::AgentRegion;

/// Stable identity of an agent across reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentKey {
    pub ip: String,
    pub name: String,
}

impl AgentKey {
    #[must_use]
    pub fn new(ip: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.ip, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentStatus {
    #[default]
    Unknown,
    Ready,
    Busy,
    Updating,
    Inactive,
    WrongRegion,
}

impl AgentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Unknown => "UNKNOWN",
            AgentStatus::Ready => "READY",
            AgentStatus::Busy => "BUSY",
            AgentStatus::Updating => "UPDATING",
            AgentStatus::Inactive => "INACTIVE",
            AgentStatus::WrongRegion => "WRONG_REGION",
        }
    }

    /// Whether an agent in this state counts as connected and usable.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            AgentStatus::Ready | AgentStatus::Busy | AgentStatus::Updating
        )
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "UNKNOWN" => Ok(AgentStatus::Unknown),
            "READY" => Ok(AgentStatus::Ready),
            "BUSY" => Ok(AgentStatus::Busy),
            "UPDATING" => Ok(AgentStatus::Updating),
            "INACTIVE" => Ok(AgentStatus::Inactive),
            "WRONG_REGION" => Ok(AgentStatus::WrongRegion),
            _ => Err(ValidationError::InvalidAgentStatus {
                value: value.to_owned(),
            }),
        }
    }
}

/// Durable state of an agent as last reconciled by some controller.
///
/// `version` is the optimistic concurrency token: writes only land when the
/// stored version still matches the one that was read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: Option<i64>,
    pub ip: String,
    pub name: String,
    pub port: u16,
    pub region: AgentRegion,
    pub status: AgentStatus,
    pub approved: bool,
    pub version: u64,
}

impl AgentRecord {
    /// Builds an unsaved record from a live connection. Approval is never
    /// inferred from live state.
    #[must_use]
    pub fn from_live(live: &LiveAgent) -> Self {
        Self {
            id: None,
            ip: live.key.ip.clone(),
            name: live.key.name.clone(),
            port: live.port,
            region: live.region.clone(),
            status: live.status,
            approved: false,
            version: 0,
        }
    }

    #[must_use]
    pub fn key(&self) -> AgentKey {
        AgentKey::new(self.ip.as_str(), self.name.as_str())
    }

    #[must_use]
    pub fn bare_region(&self) -> &str {
        self.region.name()
    }
}

/// Point-in-time view of an agent attached to this controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveAgent {
    pub key: AgentKey,
    pub port: u16,
    pub status: AgentStatus,
    /// Region the agent claims in its own configuration.
    pub region: AgentRegion,
}
