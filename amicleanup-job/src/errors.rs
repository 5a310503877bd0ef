use amicleanup_providers::ProviderError;

/// Failures that abort a cleanup pass. All of them happen before anything is deleted.
///
/// Per-item delete failures are not errors at this level; they are recorded in the
/// `DeletionReport`.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("failed to list {resource}: {source}")]
    Enumeration {
        resource: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("image {image_id} has malformed creation date {value:?}: {source}")]
    MalformedTimestamp {
        image_id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

impl CleanupError {
    pub(crate) fn listing(resource: &'static str) -> impl FnOnce(ProviderError) -> Self {
        move |source| CleanupError::Enumeration { resource, source }
    }
}
