//! Cluster coordination core.
//!
//! Controllers never talk to each other directly. They converge through
//! the shared agent registry (reconciliation), deliver commands through
//! the shared cache (request bus), and publish agent metrics the same way
//! (monitoring).
mod bus;
mod capacity;
mod handlers;
mod manager;
mod monitoring;
mod reconcile;

#[cfg(test)]
mod test_support;

pub use bus::{DrainOutcome, RequestBus, RequestDrain};
pub use capacity::CapacityAccountant;
pub use handlers::{RequestHandler, RequestHandlers, ShareSystemDataHandler, StopAgentHandler};
pub use manager::ClusterAgentManager;
pub use monitoring::{AgentMonitor, MonitorPoll, PollOutcome};
pub use reconcile::{ReconcileOutcome, ReconcilePlan, Reconciler, plan_reconciliation};
