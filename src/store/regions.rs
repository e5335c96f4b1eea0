use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::ports::{RegionDirectory, SharedCache};
use crate::scheduler::PeriodicTask;

fn normalize<I>(regions: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    regions
        .into_iter()
        .map(|region| region.trim().to_owned())
        .filter(|region| !region.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fixed region membership taken from configuration.
pub struct StaticRegions {
    regions: Vec<String>,
}

impl StaticRegions {
    #[must_use]
    pub fn new(regions: Vec<String>) -> Self {
        Self {
            regions: normalize(regions),
        }
    }
}

#[async_trait]
impl RegionDirectory for StaticRegions {
    async fn known_regions(&self) -> AppResult<Vec<String>> {
        Ok(self.regions.clone())
    }
}

/// Region membership discovered through the shared cache.
///
/// Every controller periodically announces its own region with a TTL; a
/// region whose controllers all stop announcing drops out once the TTL
/// lapses. Configured regions are always members.
pub struct AnnouncedRegions {
    local_region: String,
    configured: Vec<String>,
    cache: Arc<dyn SharedCache>,
    ttl: Duration,
}

impl AnnouncedRegions {
    #[must_use]
    pub fn new(
        local_region: impl Into<String>,
        configured: Vec<String>,
        cache: Arc<dyn SharedCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            local_region: local_region.into(),
            configured: normalize(configured),
            cache,
            ttl,
        }
    }

    /// Refreshes this controller's membership entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the cache is unreachable.
    pub async fn announce(&self) -> AppResult<()> {
        self.cache
            .put(&self.local_region, self.local_region.clone(), self.ttl)
            .await
    }
}

#[async_trait]
impl RegionDirectory for AnnouncedRegions {
    async fn known_regions(&self) -> AppResult<Vec<String>> {
        let announced = self.cache.live_keys().await?;
        Ok(normalize(
            self.configured
                .iter()
                .cloned()
                .chain(std::iter::once(self.local_region.clone()))
                .chain(announced),
        ))
    }
}

#[async_trait]
impl PeriodicTask for AnnouncedRegions {
    async fn tick(&self) -> AppResult<()> {
        self.announce().await
    }
}
