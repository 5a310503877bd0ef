use std::path::PathBuf;

use crate::orphans::RetentionPolicy;

pub const DEFAULT_PROVIDER: &str = "mock";
pub const DEFAULT_OWNER: &str = "self";
pub const DEFAULT_MOCK_ACCOUNT_ID: &str = "123456789012";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{key} must be a non-negative number of days, got {value:?}")]
    InvalidRetention { key: &'static str, value: String },
}

/// Job configuration, read from the environment (a `.env` file is honoured by `main`).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Backend name resolved by `ProviderManager`.
    pub provider: String,
    pub retention: RetentionPolicy,
    /// Owner alias passed to the image listing; `self` is the calling account.
    pub owner: String,
    pub mock_inventory_file: Option<PathBuf>,
    pub mock_account_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_string(),
            retention: RetentionPolicy::default(),
            owner: DEFAULT_OWNER.to_string(),
            mock_inventory_file: None,
            mock_account_id: DEFAULT_MOCK_ACCOUNT_ID.to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values behave like unset ones.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Settings::default();

        let retention = match get("AMICLEANUP_RETENTION_DAYS") {
            None => defaults.retention,
            Some(raw) => {
                let days: u32 = raw.parse().map_err(|_| SettingsError::InvalidRetention {
                    key: "AMICLEANUP_RETENTION_DAYS",
                    value: raw.clone(),
                })?;
                RetentionPolicy::days(days)
            }
        };

        Ok(Self {
            provider: get("PROVIDER").unwrap_or(defaults.provider),
            retention,
            owner: get("AMICLEANUP_OWNER").unwrap_or(defaults.owner),
            mock_inventory_file: get("MOCK_INVENTORY_FILE").map(PathBuf::from),
            mock_account_id: get("MOCK_ACCOUNT_ID").unwrap_or(defaults.mock_account_id),
        })
    }
}
