//! Seams to the collaborators the cluster core coordinates through.
mod cache;
mod directory;
mod regions;
mod registry;

pub use cache::{SharedCache, get_json, put_json};
pub use directory::{AgentControl, LiveAgentDirectory};
pub use regions::RegionDirectory;
pub use registry::{AgentRegistry, SaveOutcome};
