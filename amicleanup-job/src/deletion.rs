use amicleanup_common::{DeletionOutcome, DeletionReport, ResourceKind};
use amicleanup_providers::{ComputeProvider, ProviderResult};
use tracing::{error, info, warn};

/// Removes images and snapshots one at a time, images first.
///
/// Deregistering an image does not depend on its snapshots being gone, and the
/// reverse holds too, so a failure in one phase never blocks the other.
pub struct DeletionExecutor<'a> {
    provider: &'a dyn ComputeProvider,
}

impl<'a> DeletionExecutor<'a> {
    pub fn new(provider: &'a dyn ComputeProvider) -> Self {
        Self { provider }
    }

    /// Attempts every item and records one outcome per attempt. A failed item is
    /// logged and left for the next run.
    pub async fn execute(
        &self,
        orphaned_images: &[String],
        snapshots: &[String],
        dry_run: bool,
    ) -> DeletionReport {
        let mut report = DeletionReport::default();

        for image_id in orphaned_images {
            let res = self.provider.deregister_image(image_id, dry_run).await;
            report.push(
                ResourceKind::Image,
                image_id,
                outcome(ResourceKind::Image, image_id, dry_run, res),
            );
        }

        for snapshot_id in snapshots {
            let res = self.provider.delete_snapshot(snapshot_id, dry_run).await;
            report.push(
                ResourceKind::Snapshot,
                snapshot_id,
                outcome(ResourceKind::Snapshot, snapshot_id, dry_run, res),
            );
        }

        report
    }
}

fn outcome(
    resource: ResourceKind,
    id: &str,
    dry_run: bool,
    res: ProviderResult<()>,
) -> DeletionOutcome {
    match res {
        Ok(()) => {
            if dry_run {
                // The provider ignored the flag; the deletion is real.
                warn!(%resource, id, "provider committed a deletion requested as dry run");
            } else {
                info!(%resource, id, "deleted");
            }
            DeletionOutcome::Deleted
        }
        Err(e) if e.is_dry_run() => {
            info!(%resource, id, "dry run: deletion would have succeeded");
            DeletionOutcome::DryRun
        }
        Err(e) => {
            error!(%resource, id, code = e.code(), error = %e, "deletion failed");
            DeletionOutcome::Failed {
                code: e.code().to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amicleanup_common::Snapshot;
    use amicleanup_providers::mock::MockProvider;

    async fn seeded() -> (MockProvider, Vec<String>, Vec<String>) {
        let provider = MockProvider::new();
        let instances = provider.launch_instances("ami-base", 3).await;
        let mut images = Vec::new();
        for id in &instances {
            images.push(provider.create_image(id, "unused").await.unwrap());
        }
        let snapshots = provider
            .snapshots()
            .await
            .into_iter()
            .map(|s: Snapshot| s.snapshot_id)
            .collect();
        (provider, images, snapshots)
    }

    #[tokio::test]
    async fn dry_run_keeps_everything() {
        let (provider, images, snapshots) = seeded().await;

        let report = DeletionExecutor::new(&provider).execute(&images, &snapshots, true).await;

        assert!(!report.has_failures());
        assert_eq!(report.count(ResourceKind::Image, &DeletionOutcome::DryRun), 3);
        assert_eq!(report.count(ResourceKind::Snapshot, &DeletionOutcome::DryRun), 3);
        assert_eq!(provider.images().await.len(), 3);
        assert_eq!(provider.snapshots().await.len(), 3);
    }

    #[tokio::test]
    async fn deletes_images_before_snapshots() {
        let (provider, images, snapshots) = seeded().await;

        let report = DeletionExecutor::new(&provider).execute(&images, &snapshots, false).await;

        assert!(!report.has_failures());
        assert!(provider.images().await.is_empty());
        assert!(provider.snapshots().await.is_empty());

        let calls = provider.calls().await;
        assert_eq!(calls.len(), 6);
        assert!(calls[..3].iter().all(|c| c.starts_with("DeregisterImage")));
        assert!(calls[3..].iter().all(|c| c.starts_with("DeleteSnapshot")));
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let (provider, images, snapshots) = seeded().await;
        provider.fail_deletion_of(&images[0], "UnauthorizedOperation").await;

        let report = DeletionExecutor::new(&provider).execute(&images, &snapshots, false).await;

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, images[0]);
        assert!(matches!(
            &failures[0].outcome,
            DeletionOutcome::Failed { code, .. } if code == "UnauthorizedOperation"
        ));
        assert_eq!(report.count(ResourceKind::Image, &DeletionOutcome::Deleted), 2);
        assert_eq!(report.count(ResourceKind::Snapshot, &DeletionOutcome::Deleted), 3);

        let remaining: Vec<String> =
            provider.images().await.into_iter().map(|i| i.image_id).collect();
        assert_eq!(remaining, vec![images[0].clone()]);
    }

    #[tokio::test]
    async fn non_dry_run_errors_surface_during_dry_run() {
        let (provider, images, _) = seeded().await;
        let missing = vec!["snap-gone".to_string()];

        let report = DeletionExecutor::new(&provider).execute(&images[..1], &missing, true).await;

        assert_eq!(report.count(ResourceKind::Image, &DeletionOutcome::DryRun), 1);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].resource, ResourceKind::Snapshot);
        assert!(matches!(
            &failures[0].outcome,
            DeletionOutcome::Failed { code, .. } if code == "InvalidSnapshot.NotFound"
        ));
    }
}
