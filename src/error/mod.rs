mod agent;
mod app;
mod config;
mod store;
mod validation;

#[cfg(test)]
mod test_support;

pub use agent::AgentError;
pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use store::StoreError;
pub use validation::ValidationError;
