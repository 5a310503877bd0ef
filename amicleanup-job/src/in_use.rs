use std::collections::HashSet;

use amicleanup_providers::ComputeProvider;

use crate::errors::CleanupError;

/// Collects the ids of every image some instance was launched from.
pub struct InUseSetCollector<'a> {
    provider: &'a dyn ComputeProvider,
}

impl<'a> InUseSetCollector<'a> {
    pub fn new(provider: &'a dyn ComputeProvider) -> Self {
        Self { provider }
    }

    /// Instances in every state count, terminated ones included, as long as the
    /// provider still lists them.
    pub async fn collect_in_use_images(&self) -> Result<HashSet<String>, CleanupError> {
        let instances = self
            .provider
            .list_instances()
            .await
            .map_err(CleanupError::listing("instances"))?;

        Ok(instances.into_iter().map(|i| i.image_id).collect())
    }
}
