// Shared fixtures for the cleanup integration tests.
// Everything runs against the in-memory MockProvider.
#![allow(dead_code)]

use amicleanup_common::{Filter, Image, Instance, Snapshot};
use amicleanup_job::clock::FixedClock;
use amicleanup_providers::mock::MockProvider;
use amicleanup_providers::{ComputeProvider, ProviderError, ProviderResult};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

pub const IN_USE_IMAGE: &str = "ami-inuse";

pub fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
}

/// Five instances launched from `ami-inuse`, each imaged as "unused", then all terminated.
/// Returns the provider and the five image ids.
pub async fn provider_with_unused_images() -> (MockProvider, Vec<String>) {
    let provider = MockProvider::new();
    let instances = provider.launch_instances(IN_USE_IMAGE, 5).await;

    let mut unused = Vec::new();
    for id in &instances {
        unused.push(provider.create_image(id, "unused").await.unwrap());
    }
    for id in &instances {
        provider.terminate_instance(id).await.unwrap();
    }
    (provider, unused)
}

pub fn sorted(mut ids: Vec<String>) -> Vec<String> {
    ids.sort();
    ids
}

/// Which listing call should fail.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Broken {
    Instances,
    Images,
    Snapshots,
}

/// Wraps a MockProvider and fails one listing call.
pub struct BrokenListing {
    pub inner: MockProvider,
    pub broken: Broken,
}

fn throttled() -> ProviderError {
    ProviderError::api("RequestLimitExceeded", "Request limit exceeded.")
}

#[async_trait]
impl ComputeProvider for BrokenListing {
    async fn list_instances(&self) -> ProviderResult<Vec<Instance>> {
        if self.broken == Broken::Instances {
            return Err(throttled());
        }
        self.inner.list_instances().await
    }

    async fn list_images(
        &self,
        owners: &[String],
        filters: &[Filter],
    ) -> ProviderResult<Vec<Image>> {
        if self.broken == Broken::Images {
            return Err(throttled());
        }
        self.inner.list_images(owners, filters).await
    }

    async fn list_snapshots(&self) -> ProviderResult<Vec<Snapshot>> {
        if self.broken == Broken::Snapshots {
            return Err(throttled());
        }
        self.inner.list_snapshots().await
    }

    async fn deregister_image(&self, image_id: &str, dry_run: bool) -> ProviderResult<()> {
        self.inner.deregister_image(image_id, dry_run).await
    }

    async fn delete_snapshot(&self, snapshot_id: &str, dry_run: bool) -> ProviderResult<()> {
        self.inner.delete_snapshot(snapshot_id, dry_run).await
    }
}
