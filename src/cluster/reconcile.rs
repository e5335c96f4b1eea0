use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::{AgentKey, AgentRecord, AgentStatus, LiveAgent};
use crate::error::AppResult;
use crate::ports::{AgentRegistry, LiveAgentDirectory, RegionDirectory};
use crate::scheduler::PeriodicTask;

/// Registry writes derived from one comparison of live and stored state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Changed or newly discovered records.
    pub save: Vec<AgentRecord>,
    /// Records whose region left the cluster and which nobody serves.
    pub delete: Vec<AgentRecord>,
}

impl ReconcilePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.save.is_empty() && self.delete.is_empty()
    }
}

/// Diffs the agents attached to this controller against the registry.
///
/// Live state wins for port and status; the registry keeps `approved`.
/// Region mismatches are flagged as `WRONG_REGION`, never rewritten, so the
/// misconfiguration stays visible to operators.
#[must_use]
pub fn plan_reconciliation(
    local_region: &str,
    known_regions: &[String],
    live: Vec<LiveAgent>,
    records: Vec<AgentRecord>,
) -> ReconcilePlan {
    let mut attached: HashMap<AgentKey, LiveAgent> = live
        .into_iter()
        .map(|agent| (agent.key.clone(), agent))
        .collect();
    let is_known = |region: &str| {
        region == local_region || known_regions.iter().any(|known| known == region)
    };
    let mut plan = ReconcilePlan::default();

    for mut record in records {
        let is_local = record.bare_region() == local_region;
        match attached.remove(&record.key()) {
            Some(live) if is_local => {
                if record.port != live.port || record.status != live.status {
                    record.port = live.port;
                    record.status = live.status;
                    plan.save.push(record);
                }
            }
            Some(_) => {
                if record.status != AgentStatus::WrongRegion {
                    record.status = AgentStatus::WrongRegion;
                    plan.save.push(record);
                }
            }
            None if is_local => {
                if record.status != AgentStatus::Inactive {
                    record.status = AgentStatus::Inactive;
                    plan.save.push(record);
                }
            }
            None => {
                if !is_known(record.bare_region()) {
                    plan.delete.push(record);
                }
            }
        }
    }

    let mut discovered: Vec<LiveAgent> = attached.into_values().collect();
    discovered.sort_by(|left, right| left.key.cmp(&right.key));
    for live in discovered {
        let mut record = AgentRecord::from_live(&live);
        if live.region.name() != local_region {
            record.status = AgentStatus::WrongRegion;
        }
        plan.save.push(record);
    }

    plan
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub saved: usize,
    pub conflicts: usize,
    pub deleted: usize,
}

/// Keeps the registry in line with the agents attached to this controller.
pub struct Reconciler {
    local_region: String,
    registry: Arc<dyn AgentRegistry>,
    directory: Arc<dyn LiveAgentDirectory>,
    regions: Arc<dyn RegionDirectory>,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        local_region: impl Into<String>,
        registry: Arc<dyn AgentRegistry>,
        directory: Arc<dyn LiveAgentDirectory>,
        regions: Arc<dyn RegionDirectory>,
    ) -> Self {
        Self {
            local_region: local_region.into(),
            registry,
            directory,
            regions,
        }
    }

    /// Runs one reconciliation pass.
    ///
    /// Records changed concurrently by another controller are skipped and
    /// picked up again on the next pass.
    ///
    /// # Errors
    ///
    /// Returns an error when the registry or region directory is unreachable.
    pub async fn reconcile(&self) -> AppResult<ReconcileOutcome> {
        let known_regions = self.regions.known_regions().await?;
        let live = self.directory.attached().await;
        let records = self.registry.find_all().await?;
        let plan = plan_reconciliation(&self.local_region, &known_regions, live, records);
        if plan.is_empty() {
            debug!("Agent registry already reconciled");
            return Ok(ReconcileOutcome::default());
        }

        let save = self.registry.save(plan.save).await?;
        for key in &save.conflicts {
            warn!(
                "Agent {} was modified concurrently; deferring to next reconciliation",
                key
            );
        }
        let deleted = self.registry.delete(plan.delete).await?;
        let outcome = ReconcileOutcome {
            saved: save.saved,
            conflicts: save.conflicts.len(),
            deleted,
        };
        info!(
            "Reconciled agents (saved={}, deleted={}, conflicts={})",
            outcome.saved, outcome.deleted, outcome.conflicts
        );
        Ok(outcome)
    }
}

#[async_trait]
impl PeriodicTask for Reconciler {
    async fn tick(&self) -> AppResult<()> {
        self.reconcile().await.map(drop)
    }
}

#[cfg(test)]
mod tests;
