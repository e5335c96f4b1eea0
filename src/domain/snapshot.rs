use serde::{Deserialize, Serialize};

/// Latest system metrics sample reported by an agent.
///
/// The default value is the explicit "no data" snapshot handed out when
/// nothing has been collected for an agent yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSnapshot {
    pub system: String,
    pub cpu_used_percentage: f32,
    pub total_memory_kb: u64,
    pub free_memory_kb: u64,
    pub received_per_sec: u64,
    pub sent_per_sec: u64,
    /// Unix epoch millis of collection, 0 when empty.
    pub collected_at_ms: i64,
}

impl SystemSnapshot {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.collected_at_ms == 0
    }
}
