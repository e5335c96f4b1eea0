use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::request::REQUEST_KEY_DELIMITER;

/// Marker separating the bare region from the owning user id in the
/// legacy `"<region>_owned_<user>"` encoding.
pub const OWNED_DELIMITER: &str = "_owned_";

/// Strips the ownership suffix from a stored region string.
///
/// Inputs without the suffix are returned unchanged.
#[must_use]
pub fn extract_region(agent_region: &str) -> &str {
    agent_region
        .split_once(OWNED_DELIMITER)
        .map_or(agent_region, |(region, _)| region)
}

/// Checks that a bare region name can be encoded unambiguously in both the
/// ownership suffix and request bus keys.
///
/// # Errors
///
/// Returns an error when the name is empty or contains a reserved delimiter.
pub fn validate_region_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::RegionEmpty);
    }
    if name.contains(OWNED_DELIMITER) {
        return Err(ValidationError::RegionContainsDelimiter {
            value: name.to_owned(),
            delimiter: OWNED_DELIMITER,
        });
    }
    if name.contains(REQUEST_KEY_DELIMITER) {
        return Err(ValidationError::RegionContainsDelimiter {
            value: name.to_owned(),
            delimiter: "|",
        });
    }
    Ok(())
}

/// Region an agent belongs to, optionally reserved for a single user.
///
/// Serialized through the legacy string form so stored rows and cache
/// payloads stay readable by older controllers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AgentRegion {
    region: String,
    owner: Option<String>,
}

impl AgentRegion {
    #[must_use]
    pub fn shared(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            owner: None,
        }
    }

    #[must_use]
    pub fn owned(region: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            owner: Some(owner.into()),
        }
    }

    /// Parses the legacy encoding. The first `_owned_` splits region from owner.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let region = extract_region(value);
        match value
            .get(region.len()..)
            .and_then(|rest| rest.strip_prefix(OWNED_DELIMITER))
        {
            Some(owner) => Self::owned(region, owner),
            None => Self::shared(region),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.region
    }

    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    #[must_use]
    pub const fn is_shared(&self) -> bool {
        self.owner.is_none()
    }

    #[must_use]
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner.as_deref() == Some(user_id)
    }
}

impl fmt::Display for AgentRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner.as_deref() {
            Some(owner) => write!(f, "{}{}{}", self.region, OWNED_DELIMITER, owner),
            None => f.write_str(&self.region),
        }
    }
}

impl From<String> for AgentRegion {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for AgentRegion {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<AgentRegion> for String {
    fn from(value: AgentRegion) -> Self {
        value.to_string()
    }
}
