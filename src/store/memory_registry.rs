use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::AgentRecord;
use crate::error::AppResult;
use crate::ports::{AgentRegistry, SaveOutcome};

#[derive(Default)]
struct RegistryState {
    next_id: i64,
    records: BTreeMap<i64, AgentRecord>,
}

/// In-process registry with the same versioning rules as the SQLite one.
#[derive(Default)]
pub struct MemoryAgentRegistry {
    state: Mutex<RegistryState>,
}

impl MemoryAgentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRegistry for MemoryAgentRegistry {
    async fn find_all(&self) -> AppResult<Vec<AgentRecord>> {
        Ok(self.state.lock().await.records.values().cloned().collect())
    }

    async fn find_by_region_prefix(&self, prefix: &str) -> AppResult<Vec<AgentRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .records
            .values()
            .filter(|record| record.region.to_string().starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<AgentRecord>> {
        Ok(self.state.lock().await.records.get(&id).cloned())
    }

    async fn save(&self, records: Vec<AgentRecord>) -> AppResult<SaveOutcome> {
        let mut state = self.state.lock().await;
        let mut outcome = SaveOutcome::default();
        for mut record in records {
            let accepted = match record.id {
                None => {
                    let key = record.key();
                    if state.records.values().any(|existing| existing.key() == key) {
                        false
                    } else {
                        let id = state.next_id.saturating_add(1);
                        state.next_id = id;
                        record.id = Some(id);
                        record.version = 1;
                        state.records.insert(id, record.clone());
                        true
                    }
                }
                Some(id) => match state.records.get_mut(&id) {
                    Some(existing) if existing.version == record.version => {
                        record.version = record.version.saturating_add(1);
                        *existing = record.clone();
                        true
                    }
                    Some(_) | None => false,
                },
            };
            if accepted {
                outcome.saved = outcome.saved.saturating_add(1);
            } else {
                outcome.conflicts.push(record.key());
            }
        }
        Ok(outcome)
    }

    async fn delete(&self, records: Vec<AgentRecord>) -> AppResult<usize> {
        let mut state = self.state.lock().await;
        let mut deleted = 0usize;
        for record in records {
            let Some(id) = record.id else {
                continue;
            };
            let matches = state
                .records
                .get(&id)
                .is_some_and(|existing| existing.version == record.version);
            if matches {
                state.records.remove(&id);
                deleted = deleted.saturating_add(1);
            }
        }
        Ok(deleted)
    }
}
