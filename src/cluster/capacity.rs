use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::warn;

use crate::domain::AgentRecord;
use crate::error::AppResult;
use crate::ports::{AgentRegistry, RegionDirectory};

#[derive(Default)]
struct RegionTally {
    shared: usize,
    owned: usize,
}

/// Counts the agents a user can run tests on, per region.
///
/// Shared-pool agents are capped at `max_agents_per_console`; agents owned
/// by the user are added on top without a cap. Only records whose bare
/// region is the local one are counted.
pub struct CapacityAccountant {
    local_region: String,
    max_agents_per_console: usize,
    registry: Arc<dyn AgentRegistry>,
    regions: Arc<dyn RegionDirectory>,
}

impl CapacityAccountant {
    #[must_use]
    pub fn new(
        local_region: impl Into<String>,
        max_agents_per_console: usize,
        registry: Arc<dyn AgentRegistry>,
        regions: Arc<dyn RegionDirectory>,
    ) -> Self {
        Self {
            local_region: local_region.into(),
            max_agents_per_console,
            registry,
            regions,
        }
    }

    /// # Errors
    ///
    /// Returns an error when the registry or region directory is unreachable.
    pub async fn available_agents(&self, user_id: &str) -> AppResult<BTreeMap<String, usize>> {
        let known_regions = self.regions.known_regions().await?;
        let records = self.registry.find_by_region_prefix(&self.local_region).await?;
        Ok(self.tally(user_id, &known_regions, &records))
    }

    /// Counts `records` into one entry per known region.
    #[must_use]
    pub fn tally(
        &self,
        user_id: &str,
        known_regions: &[String],
        records: &[AgentRecord],
    ) -> BTreeMap<String, usize> {
        let mut tallies: BTreeMap<&str, RegionTally> = known_regions
            .iter()
            .map(|region| (region.as_str(), RegionTally::default()))
            .collect();

        let counted = records.iter().filter(|record| {
            record.approved
                && record.status.is_active()
                && record.bare_region() == self.local_region
        });
        for record in counted {
            let Some(tally) = tallies.get_mut(record.bare_region()) else {
                warn!(
                    "Agent {} is in region {} which is not a known region; not counted",
                    record.key(),
                    record.bare_region()
                );
                continue;
            };
            // Agents reserved for other users count for nobody here.
            if record.region.is_owned_by(user_id) {
                tally.owned = tally.owned.saturating_add(1);
            } else if record.region.is_shared() {
                tally.shared = tally.shared.saturating_add(1);
            }
        }

        tallies
            .into_iter()
            .map(|(region, tally)| {
                let available = tally
                    .shared
                    .min(self.max_agents_per_console)
                    .saturating_add(tally.owned);
                (region.to_owned(), available)
            })
            .collect()
    }
}
