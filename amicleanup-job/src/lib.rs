//! Finds images no instance was launched from, together with the snapshots created
//! for them, and removes both once they are past the retention window.

pub mod association;
pub mod cleanup;
pub mod clock;
pub mod deletion;
pub mod errors;
pub mod in_use;
pub mod orphans;
pub mod provider_manager;
pub mod settings;
pub mod snapshots;

pub use cleanup::{handle_event, CleanupJob};
pub use errors::CleanupError;
pub use settings::Settings;
