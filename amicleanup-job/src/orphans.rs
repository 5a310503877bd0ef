use amicleanup_common::{Filter, Image};
use amicleanup_providers::ComputeProvider;
use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::errors::CleanupError;
use crate::in_use::InUseSetCollector;

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Minimum age an unused image must reach before it is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::days(DEFAULT_RETENTION_DAYS)
    }
}

impl RetentionPolicy {
    pub fn days(days: u32) -> Self {
        Self {
            max_age: Duration::days(i64::from(days)),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Strictly older than the window; an image exactly at the boundary is kept.
    ///
    /// A window reaching past the earliest representable time expires nothing.
    pub fn is_expired(&self, created: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match now.checked_sub_signed(self.max_age) {
            Some(cutoff) => created < cutoff,
            None => false,
        }
    }
}

pub struct OrphanImageFinder<'a> {
    provider: &'a dyn ComputeProvider,
    clock: &'a dyn Clock,
    retention: RetentionPolicy,
    owner: String,
}

impl<'a> OrphanImageFinder<'a> {
    pub fn new(
        provider: &'a dyn ComputeProvider,
        clock: &'a dyn Clock,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            provider,
            clock,
            retention,
            owner: "self".to_string(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Image ids owned by the caller, unused by any instance and past the retention
    /// window, in the order the provider lists them.
    ///
    /// `filters` are handed to the provider untouched and narrow the candidates
    /// before anything else is checked.
    pub async fn find_orphaned_images(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<String>, CleanupError> {
        let in_use = InUseSetCollector::new(self.provider)
            .collect_in_use_images()
            .await?;

        let candidates = self
            .provider
            .list_images(std::slice::from_ref(&self.owner), filters)
            .await
            .map_err(CleanupError::listing("images"))?;

        let now = self.clock.now();
        let mut orphaned = Vec::new();
        for image in candidates {
            if in_use.contains(&image.image_id) {
                continue;
            }
            if self.retention.is_expired(created_at(&image)?, now) {
                orphaned.push(image.image_id);
            }
        }
        Ok(orphaned)
    }
}

fn created_at(image: &Image) -> Result<DateTime<Utc>, CleanupError> {
    image
        .creation_date()
        .map(|date| date.resolve())
        .map_err(|source| CleanupError::MalformedTimestamp {
            image_id: image.image_id.clone(),
            value: image.creation_date.clone().unwrap_or_default(),
            source,
        })
}
