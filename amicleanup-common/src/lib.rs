use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Creation timestamps come back as e.g. `2016-03-04T17:22:41.000Z`.
pub const CREATION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Prefix the provider writes on every snapshot produced while creating an image.
pub const CREATE_IMAGE_DESCRIPTION_PREFIX: &str = "Created by CreateImage";

// --- Enums ---

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
    Snapshot,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Image => f.write_str("image"),
            ResourceKind::Snapshot => f.write_str("snapshot"),
        }
    }
}

// --- Inventory entities ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Instance {
    pub instance_id: String,
    pub image_id: String,
    pub state: InstanceState,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Image {
    pub image_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_image_state")]
    pub state: String,
    // Some backends (simulators in particular) never report this.
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_image_state() -> String {
    "available".to_string()
}

impl Image {
    pub fn creation_date(&self) -> Result<CreationDate, chrono::ParseError> {
        CreationDate::parse(self.creation_date.as_deref())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Snapshot {
    pub snapshot_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub description: String,
}

/// Provider-side predicate, passed through verbatim (`{"Name": ..., "Values": [...]}`).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Filter {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl Filter {
    pub fn new(
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

// --- Creation dates ---

/// An image's creation timestamp as reported by the provider.
///
/// `Absent` is a legitimate provider answer, not a parse failure: it resolves to the
/// Unix epoch so the image always clears the retention threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationDate {
    Absent,
    At(DateTime<Utc>),
}

impl CreationDate {
    pub fn parse(raw: Option<&str>) -> Result<Self, chrono::ParseError> {
        match raw {
            None => Ok(CreationDate::Absent),
            Some(s) => {
                let naive = NaiveDateTime::parse_from_str(s.trim(), CREATION_DATE_FORMAT)?;
                Ok(CreationDate::At(Utc.from_utc_datetime(&naive)))
            }
        }
    }

    pub fn resolve(self) -> DateTime<Utc> {
        match self {
            // DateTime<Utc>::default() is 1970-01-01T00:00:00Z
            CreationDate::Absent => DateTime::<Utc>::default(),
            CreationDate::At(at) => at,
        }
    }
}

// --- Invocation ---

/// Trigger payload. Both fields are optional; unknown keys are ignored.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CleanupEvent {
    #[serde(rename = "DryRun", default)]
    pub dry_run: bool,
    #[serde(rename = "Filters", default)]
    pub filters: Vec<Filter>,
}

impl CleanupEvent {
    /// Blank input is the default event.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(input)
    }
}

// --- Results ---

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Deleted,
    /// The provider confirmed the call would have succeeded.
    DryRun,
    Failed { code: String, message: String },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeletionRecord {
    pub resource: ResourceKind,
    pub id: String,
    #[serde(flatten)]
    pub outcome: DeletionOutcome,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DeletionReport {
    pub records: Vec<DeletionRecord>,
}

impl DeletionReport {
    pub fn push(&mut self, resource: ResourceKind, id: &str, outcome: DeletionOutcome) {
        self.records.push(DeletionRecord {
            resource,
            id: id.to_string(),
            outcome,
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeletionRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, DeletionOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn count(&self, resource: ResourceKind, outcome: &DeletionOutcome) -> usize {
        self.records
            .iter()
            .filter(|r| {
                r.resource == resource
                    && std::mem::discriminant(&r.outcome) == std::mem::discriminant(outcome)
            })
            .count()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub dry_run: bool,
    pub orphaned_images: Vec<String>,
    pub snapshots: Vec<String>,
    pub deletions: DeletionReport,
}
