use amicleanup_common::{Snapshot, CREATE_IMAGE_DESCRIPTION_PREFIX};

/// Decides which image, if any, a snapshot was produced for.
pub trait AssociationInferer: Send + Sync {
    /// Returns the first id in `candidates` that `snapshot` belongs to.
    fn source_image<'c>(&self, snapshot: &Snapshot, candidates: &'c [String]) -> Option<&'c str>;
}

/// Reads the association out of the description the provider writes during image
/// creation, e.g. `Created by CreateImage(i-0abc) for ami-0def from vol-0123`.
///
/// The description format belongs to the provider and is not a documented contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptionInferer;

impl AssociationInferer for DescriptionInferer {
    fn source_image<'c>(&self, snapshot: &Snapshot, candidates: &'c [String]) -> Option<&'c str> {
        let description = snapshot.description.as_str();
        if !description.starts_with(CREATE_IMAGE_DESCRIPTION_PREFIX) {
            return None;
        }
        candidates
            .iter()
            .find(|image_id| description.contains(&format!("for {} from", image_id)))
            .map(String::as_str)
    }
}
