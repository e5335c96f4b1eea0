//! CLI argument types and parsing helpers.
mod cli;
mod parsers;


pub use cli::{AgentIdArgs, CapacityArgs, ClusterArgs, Command, ListArgs, SnapshotArgs};
