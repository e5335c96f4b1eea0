use async_trait::async_trait;

use crate::error::AppResult;

#[async_trait]
pub trait RegionDirectory: Send + Sync {
    /// Regions currently part of the cluster, sorted and deduplicated.
    ///
    /// # Errors
    ///
    /// Returns an error when region membership cannot be read.
    async fn known_regions(&self) -> AppResult<Vec<String>>;
}
