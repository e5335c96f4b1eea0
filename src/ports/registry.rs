use async_trait::async_trait;

use crate::domain::{AgentKey, AgentRecord};
use crate::error::AppResult;

/// Result of a versioned batch save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOutcome {
    pub saved: usize,
    /// Records skipped because another writer changed them since they were read.
    pub conflicts: Vec<AgentKey>,
}

/// Durable store of every agent the cluster has observed.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the store is unreachable.
    async fn find_all(&self) -> AppResult<Vec<AgentRecord>>;

    /// Records whose stored region string starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable.
    async fn find_by_region_prefix(&self, prefix: &str) -> AppResult<Vec<AgentRecord>>;

    /// # Errors
    ///
    /// Returns an error when the store is unreachable.
    async fn find_by_id(&self, id: i64) -> AppResult<Option<AgentRecord>>;

    /// Inserts records without an id and updates the others when their
    /// `version` still matches the stored one. Mismatches and duplicate
    /// keys are reported as conflicts, not errors.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable.
    async fn save(&self, records: Vec<AgentRecord>) -> AppResult<SaveOutcome>;

    /// Deletes records whose `version` still matches, returning how many
    /// were removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the store is unreachable.
    async fn delete(&self, records: Vec<AgentRecord>) -> AppResult<usize>;
}
