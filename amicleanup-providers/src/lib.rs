use amicleanup_common::{Filter, Image, Instance, Snapshot};
use async_trait::async_trait;

/// Error code the provider answers with when a dry-run request would have succeeded.
pub const DRY_RUN_OPERATION: &str = "DryRunOperation";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Structured API error carrying the provider's machine-readable code.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    /// Anything below the API: transport, decoding, local I/O.
    #[error("transport error: {0}")]
    Transport(#[source] anyhow::Error),
}

impl ProviderError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ProviderError::Api { code, .. } => code,
            ProviderError::Transport(_) => "Transport",
        }
    }

    /// True only for the exact dry-run confirmation code.
    pub fn is_dry_run(&self) -> bool {
        matches!(self, ProviderError::Api { code, .. } if code == DRY_RUN_OPERATION)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Compute inventory surface consumed by the cleanup job.
///
/// Listing calls return the complete result set; pagination is the implementation's concern.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Every instance visible to the caller, all states included.
    async fn list_instances(&self) -> ProviderResult<Vec<Instance>>;

    /// Images owned by any of `owners` (`"self"` is the caller) matching all `filters`.
    async fn list_images(
        &self,
        owners: &[String],
        filters: &[Filter],
    ) -> ProviderResult<Vec<Image>>;

    /// Every snapshot visible to the caller.
    async fn list_snapshots(&self) -> ProviderResult<Vec<Snapshot>>;

    // With dry_run = true a successful call is reported as a DryRunOperation error.
    async fn deregister_image(&self, image_id: &str, dry_run: bool) -> ProviderResult<()>;
    async fn delete_snapshot(&self, snapshot_id: &str, dry_run: bool) -> ProviderResult<()>;
}

pub mod inventory {
    use amicleanup_common::{Image, Instance, Snapshot};
    use serde::{Deserialize, Serialize};
    use std::path::Path;

    #[derive(Debug, thiserror::Error)]
    pub enum InventoryError {
        #[error("failed to read inventory {path}: {source}")]
        Read {
            path: String,
            #[source]
            source: std::io::Error,
        },
        #[error("invalid inventory {path}: {source}")]
        Parse {
            path: String,
            #[source]
            source: serde_json::Error,
        },
    }

    /// Point-in-time provider state, used to seed a simulated backend.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct Inventory {
        #[serde(default)]
        pub account_id: Option<String>,
        #[serde(default)]
        pub instances: Vec<Instance>,
        #[serde(default)]
        pub images: Vec<Image>,
        #[serde(default)]
        pub snapshots: Vec<Snapshot>,
    }

    impl Inventory {
        pub fn load(path: &Path) -> Result<Self, InventoryError> {
            let raw = std::fs::read_to_string(path).map_err(|source| InventoryError::Read {
                path: path.display().to_string(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| InventoryError::Parse {
                path: path.display().to_string(),
                source,
            })
        }
    }
}

#[cfg(feature = "mock")]
pub mod mock;
