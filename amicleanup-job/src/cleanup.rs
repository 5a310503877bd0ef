use amicleanup_common::{CleanupEvent, CleanupReport};
use amicleanup_providers::ComputeProvider;
use tracing::info;

use crate::association::{AssociationInferer, DescriptionInferer};
use crate::clock::{Clock, SystemClock};
use crate::deletion::DeletionExecutor;
use crate::errors::CleanupError;
use crate::orphans::{OrphanImageFinder, RetentionPolicy};
use crate::settings::Settings;
use crate::snapshots::AssociatedSnapshotFinder;

/// One scan-then-delete pass over the provider's images and snapshots.
///
/// Every listing completes before the first delete is issued, so a pass that dies
/// halfway can simply be run again.
pub struct CleanupJob<'a> {
    provider: &'a dyn ComputeProvider,
    retention: RetentionPolicy,
    owner: String,
    clock: Box<dyn Clock>,
    inferer: Box<dyn AssociationInferer>,
}

impl<'a> CleanupJob<'a> {
    pub fn new(provider: &'a dyn ComputeProvider, settings: &Settings) -> Self {
        Self {
            provider,
            retention: settings.retention,
            owner: settings.owner.clone(),
            clock: Box::new(SystemClock),
            inferer: Box::new(DescriptionInferer),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_inferer(mut self, inferer: impl AssociationInferer + 'static) -> Self {
        self.inferer = Box::new(inferer);
        self
    }

    pub async fn run(&self, event: &CleanupEvent) -> Result<CleanupReport, CleanupError> {
        info!(
            dry_run = event.dry_run,
            filters = event.filters.len(),
            retention_days = self.retention.max_age().num_days(),
            "starting image cleanup"
        );

        let orphaned = OrphanImageFinder::new(self.provider, self.clock.as_ref(), self.retention)
            .with_owner(self.owner.clone())
            .find_orphaned_images(&event.filters)
            .await?;
        info!(count = orphaned.len(), images = ?orphaned, "orphaned images");

        let snapshots = AssociatedSnapshotFinder::new(self.provider, self.inferer.as_ref())
            .find_snapshots(&orphaned)
            .await?;
        info!(count = snapshots.len(), snapshots = ?snapshots, "associated snapshots");

        let deletions = DeletionExecutor::new(self.provider)
            .execute(&orphaned, &snapshots, event.dry_run)
            .await;
        info!(
            attempted = deletions.records.len(),
            failed = deletions.failures().count(),
            "image cleanup finished"
        );

        Ok(CleanupReport {
            dry_run: event.dry_run,
            orphaned_images: orphaned,
            snapshots,
            deletions,
        })
    }
}

/// Entry point for a single trigger: system clock, description-based association.
pub async fn handle_event(
    provider: &dyn ComputeProvider,
    settings: &Settings,
    event: &CleanupEvent,
) -> Result<CleanupReport, CleanupError> {
    CleanupJob::new(provider, settings).run(event).await
}
