use amicleanup_providers::ComputeProvider;

use crate::association::AssociationInferer;
use crate::errors::CleanupError;

/// Finds the snapshots that were created alongside a set of images.
pub struct AssociatedSnapshotFinder<'a> {
    provider: &'a dyn ComputeProvider,
    inferer: &'a dyn AssociationInferer,
}

impl<'a> AssociatedSnapshotFinder<'a> {
    pub fn new(provider: &'a dyn ComputeProvider, inferer: &'a dyn AssociationInferer) -> Self {
        Self { provider, inferer }
    }

    /// Snapshot ids associated with any of `image_ids`, in provider listing order.
    ///
    /// Every visible snapshot is considered, whoever owns it. The listing happens even
    /// when `image_ids` is empty.
    pub async fn find_snapshots(&self, image_ids: &[String]) -> Result<Vec<String>, CleanupError> {
        let snapshots = self
            .provider
            .list_snapshots()
            .await
            .map_err(CleanupError::listing("snapshots"))?;

        Ok(snapshots
            .into_iter()
            .filter(|snapshot| self.inferer.source_image(snapshot, image_ids).is_some())
            .map(|snapshot| snapshot.snapshot_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::DescriptionInferer;
    use amicleanup_common::Snapshot;
    use amicleanup_providers::mock::MockProvider;

    fn snapshot(id: &str, owner: &str, description: &str) -> Snapshot {
        Snapshot {
            snapshot_id: id.to_string(),
            owner_id: owner.to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_candidates_yield_nothing() {
        let provider = MockProvider::new();
        provider
            .add_snapshot(snapshot(
                "snap-1",
                "123",
                "Created by CreateImage(i-1) for ami-1 from vol-1",
            ))
            .await;

        let found = AssociatedSnapshotFinder::new(&provider, &DescriptionInferer)
            .find_snapshots(&[])
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn keeps_listing_order_and_ignores_ownership() {
        let provider = MockProvider::new();
        provider
            .add_snapshot(snapshot(
                "snap-b",
                "999",
                "Created by CreateImage(i-2) for ami-b from vol-2",
            ))
            .await;
        provider
            .add_snapshot(snapshot(
                "snap-x",
                "123",
                "Created by CreateImage(i-9) for ami-x from vol-9",
            ))
            .await;
        provider.add_snapshot(snapshot("snap-manual", "123", "nightly backup of ami-a")).await;
        provider
            .add_snapshot(snapshot(
                "snap-a",
                "123",
                "Created by CreateImage(i-1) for ami-a from vol-1",
            ))
            .await;

        let found = AssociatedSnapshotFinder::new(&provider, &DescriptionInferer)
            .find_snapshots(&["ami-a".to_string(), "ami-b".to_string()])
            .await
            .unwrap();
        assert_eq!(found, vec!["snap-b".to_string(), "snap-a".to_string()]);
    }

    #[tokio::test]
    async fn snapshot_is_reported_once() {
        let provider = MockProvider::new();
        provider
            .add_snapshot(snapshot(
                "snap-1",
                "123",
                "Created by CreateImage(i-1) for ami-a from vol-1 for ami-b from vol-1",
            ))
            .await;

        let found = AssociatedSnapshotFinder::new(&provider, &DescriptionInferer)
            .find_snapshots(&["ami-a".to_string(), "ami-b".to_string()])
            .await
            .unwrap();
        assert_eq!(found, vec!["snap-1".to_string()]);
    }
}
