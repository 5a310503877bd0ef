use crate::inventory::{Inventory, InventoryError};
use crate::{ComputeProvider, ProviderError, ProviderResult, DRY_RUN_OPERATION};
use amicleanup_common::{Filter, Image, Instance, InstanceState, Snapshot};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";

#[derive(Default)]
struct MockState {
    account_id: String,
    instances: Vec<Instance>,
    images: Vec<Image>,
    snapshots: Vec<Snapshot>,
    // resource id -> error code returned by every delete of that id
    failures: HashMap<String, String>,
    calls: Vec<String>,
}

/// In-memory provider that behaves like the real API for the calls the cleanup job makes.
///
/// Instances, images and snapshots live in insertion order, which is also the
/// enumeration order. Terminated instances stay listed, and images created from an
/// instance carry no creation date, matching what simulators report.
pub struct MockProvider {
    state: Mutex<MockState>,
    provider_code: &'static str,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_account(DEFAULT_ACCOUNT_ID)
    }

    pub fn with_account(account_id: &str) -> Self {
        Self {
            state: Mutex::new(MockState {
                account_id: account_id.to_string(),
                ..MockState::default()
            }),
            provider_code: "mock",
        }
    }

    pub fn from_inventory(inventory: Inventory, default_account_id: &str) -> Self {
        let account_id = inventory
            .account_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default_account_id)
            .to_string();
        Self {
            state: Mutex::new(MockState {
                account_id,
                instances: inventory.instances,
                images: inventory.images,
                snapshots: inventory.snapshots,
                ..MockState::default()
            }),
            provider_code: "mock",
        }
    }

    pub fn load(path: &Path, default_account_id: &str) -> Result<Self, InventoryError> {
        let inventory = Inventory::load(path)?;
        Ok(Self::from_inventory(inventory, default_account_id))
    }

    pub fn provider_code(&self) -> &'static str {
        self.provider_code
    }

    pub async fn account_id(&self) -> String {
        self.state.lock().await.account_id.clone()
    }

    /// Starts `count` running instances from `image_id` and returns their ids.
    pub async fn launch_instances(&self, image_id: &str, count: usize) -> Vec<String> {
        let mut state = self.state.lock().await;
        (0..count)
            .map(|_| {
                let instance_id = new_id("i");
                state.instances.push(Instance {
                    instance_id: instance_id.clone(),
                    image_id: image_id.to_string(),
                    state: InstanceState::Running,
                });
                instance_id
            })
            .collect()
    }

    pub async fn terminate_instance(&self, instance_id: &str) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.instance_id == instance_id)
            .ok_or_else(|| instance_not_found(instance_id))?;
        instance.state = InstanceState::Terminated;
        Ok(())
    }

    /// Images an instance's root volume. Produces the image and its backing snapshot.
    pub async fn create_image(&self, instance_id: &str, name: &str) -> ProviderResult<String> {
        let mut state = self.state.lock().await;
        if !state.instances.iter().any(|i| i.instance_id == instance_id) {
            return Err(instance_not_found(instance_id));
        }

        let image_id = new_id("ami");
        let owner_id = state.account_id.clone();
        state.images.push(Image {
            image_id: image_id.clone(),
            owner_id: owner_id.clone(),
            name: Some(name.to_string()),
            state: "available".to_string(),
            creation_date: None,
            tags: BTreeMap::new(),
        });
        state.snapshots.push(Snapshot {
            snapshot_id: new_id("snap"),
            owner_id,
            description: format!(
                "Created by CreateImage({}) for {} from {}",
                instance_id,
                image_id,
                new_id("vol")
            ),
        });
        Ok(image_id)
    }

    pub async fn register_image(&self, image: Image) {
        self.state.lock().await.images.push(image);
    }

    pub async fn add_snapshot(&self, snapshot: Snapshot) {
        self.state.lock().await.snapshots.push(snapshot);
    }

    /// Every later delete of `resource_id` fails with `code`.
    pub async fn fail_deletion_of(&self, resource_id: &str, code: &str) {
        self.state
            .lock()
            .await
            .failures
            .insert(resource_id.to_string(), code.to_string());
    }

    pub async fn instances(&self) -> Vec<Instance> {
        self.state.lock().await.instances.clone()
    }

    pub async fn images(&self) -> Vec<Image> {
        self.state.lock().await.images.clone()
    }

    pub async fn snapshots(&self) -> Vec<Snapshot> {
        self.state.lock().await.snapshots.clone()
    }

    /// Mutating calls received so far, e.g. `DeregisterImage ami-123`.
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl ComputeProvider for MockProvider {
    async fn list_instances(&self) -> ProviderResult<Vec<Instance>> {
        Ok(self.state.lock().await.instances.clone())
    }

    async fn list_images(
        &self,
        owners: &[String],
        filters: &[Filter],
    ) -> ProviderResult<Vec<Image>> {
        let state = self.state.lock().await;
        let owners: Vec<&str> = owners
            .iter()
            .map(|o| if o == "self" { state.account_id.as_str() } else { o.as_str() })
            .collect();

        let mut out = Vec::new();
        for image in &state.images {
            if !owners.is_empty() && !owners.contains(&image.owner_id.as_str()) {
                continue;
            }
            let mut keep = true;
            for filter in filters {
                if !image_matches(image, filter)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                out.push(image.clone());
            }
        }
        Ok(out)
    }

    async fn list_snapshots(&self) -> ProviderResult<Vec<Snapshot>> {
        Ok(self.state.lock().await.snapshots.clone())
    }

    async fn deregister_image(&self, image_id: &str, dry_run: bool) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(format!("DeregisterImage {}", image_id));
        if let Some(code) = state.failures.get(image_id) {
            return Err(ProviderError::api(
                code.clone(),
                format!("simulated failure deregistering {}", image_id),
            ));
        }
        let Some(pos) = state.images.iter().position(|i| i.image_id == image_id) else {
            return Err(ProviderError::api(
                "InvalidAMIID.NotFound",
                format!("The image id '[{}]' does not exist", image_id),
            ));
        };
        if dry_run {
            return Err(dry_run_error());
        }
        state.images.remove(pos);
        tracing::debug!(provider = self.provider_code, image_id, "image deregistered");
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_id: &str, dry_run: bool) -> ProviderResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(format!("DeleteSnapshot {}", snapshot_id));
        if let Some(code) = state.failures.get(snapshot_id) {
            return Err(ProviderError::api(
                code.clone(),
                format!("simulated failure deleting {}", snapshot_id),
            ));
        }
        let Some(pos) = state
            .snapshots
            .iter()
            .position(|s| s.snapshot_id == snapshot_id)
        else {
            return Err(ProviderError::api(
                "InvalidSnapshot.NotFound",
                format!("The snapshot '{}' does not exist.", snapshot_id),
            ));
        };
        if dry_run {
            return Err(dry_run_error());
        }
        state.snapshots.remove(pos);
        tracing::debug!(provider = self.provider_code, snapshot_id, "snapshot deleted");
        Ok(())
    }
}

fn new_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &hex[..17])
}

fn instance_not_found(instance_id: &str) -> ProviderError {
    ProviderError::api(
        "InvalidInstanceID.NotFound",
        format!("The instance ID '{}' does not exist", instance_id),
    )
}

fn dry_run_error() -> ProviderError {
    ProviderError::api(
        DRY_RUN_OPERATION,
        "Request would have succeeded, but DryRun flag is set.",
    )
}

fn image_matches(image: &Image, filter: &Filter) -> ProviderResult<bool> {
    if filter.values.is_empty() {
        return Err(ProviderError::api(
            "InvalidParameterValue",
            format!("The filter '{}' requires at least one value", filter.name),
        ));
    }
    let any = |candidate: &str| filter.values.iter().any(|p| wildcard_match(p, candidate));

    let matched = match filter.name.as_str() {
        "name" => image.name.as_deref().is_some_and(any),
        "image-id" => any(image.image_id.as_str()),
        "state" => any(image.state.as_str()),
        "owner-id" => any(image.owner_id.as_str()),
        "tag-key" => image.tags.keys().any(|k| any(k.as_str())),
        other => match other.strip_prefix("tag:") {
            Some(key) => image.tags.get(key).is_some_and(|v| any(v.as_str())),
            None => {
                return Err(ProviderError::api(
                    "InvalidParameterValue",
                    format!("The filter '{}' is invalid", other),
                ))
            }
        },
    };
    Ok(matched)
}

/// `*` matches any run of characters, `?` exactly one.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}
