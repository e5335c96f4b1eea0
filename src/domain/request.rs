use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::agent::AgentKey;
use crate::error::ValidationError;

/// Separates the target region from the agent key in request bus keys.
pub const REQUEST_KEY_DELIMITER: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequestType {
    #[serde(rename = "STOP_AGENT")]
    StopAgent,
    #[serde(rename = "SHARE_SYSTEM_DATA_MODEL")]
    ShareSystemData,
}

impl RequestType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestType::StopAgent => "STOP_AGENT",
            RequestType::ShareSystemData => "SHARE_SYSTEM_DATA_MODEL",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "STOP_AGENT" => Ok(RequestType::StopAgent),
            "SHARE_SYSTEM_DATA_MODEL" => Ok(RequestType::ShareSystemData),
            _ => Err(ValidationError::InvalidRequestType {
                value: value.to_owned(),
            }),
        }
    }
}

/// Command addressed to an agent attached to whichever controller owns
/// the target region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    pub agent_ip: String,
    pub agent_name: String,
    pub request_type: RequestType,
}

impl ClusterRequest {
    #[must_use]
    pub fn new(key: &AgentKey, request_type: RequestType) -> Self {
        Self {
            agent_ip: key.ip.clone(),
            agent_name: key.name.clone(),
            request_type,
        }
    }

    #[must_use]
    pub fn agent_key(&self) -> AgentKey {
        AgentKey::new(self.agent_ip.as_str(), self.agent_name.as_str())
    }
}

#[must_use]
pub fn request_cache_key(region: &str, key: &AgentKey) -> String {
    format!("{}{}{}", region, REQUEST_KEY_DELIMITER, key)
}

/// Region prefix of a request bus key, if the key is well formed.
#[must_use]
pub fn request_key_region(cache_key: &str) -> Option<&str> {
    cache_key
        .split_once(REQUEST_KEY_DELIMITER)
        .map(|(region, _)| region)
}
