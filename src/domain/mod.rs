//! Cluster domain types: agent identities, registry records, region
//! ownership, cross-controller requests, and system snapshots.
mod agent;
mod region;
mod request;
mod snapshot;

pub use agent::{AgentKey, AgentRecord, AgentStatus, LiveAgent};
pub use region::{AgentRegion, OWNED_DELIMITER, extract_region, validate_region_name};
pub use request::{
    ClusterRequest, REQUEST_KEY_DELIMITER, RequestType, request_cache_key, request_key_region,
};
pub use snapshot::SystemSnapshot;
