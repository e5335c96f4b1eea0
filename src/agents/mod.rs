//! Live agent connections.
//!
//! Agents dial the controller over TCP and speak newline-delimited JSON.
//! Attached agents feed the [`LocalAgentDirectory`] that reconciliation and
//! the request bus resolve against.
mod control;
mod directory;
mod listener;
pub mod protocol;

pub use control::ConnectionControl;
pub use directory::LocalAgentDirectory;
pub use listener::AgentListener;
