use amicleanup_providers::ComputeProvider;
use anyhow::{bail, Result};

use crate::settings::Settings;

pub struct ProviderManager;

impl ProviderManager {
    pub fn get_provider(settings: &Settings) -> Result<Box<dyn ComputeProvider>> {
        match settings.provider.to_lowercase().as_str() {
            #[cfg(feature = "provider-mock")]
            "mock" => {
                use amicleanup_providers::mock::MockProvider;

                let provider = match &settings.mock_inventory_file {
                    Some(path) => {
                        tracing::info!(
                            path = %path.display(),
                            "seeding mock provider from inventory"
                        );
                        MockProvider::load(path, &settings.mock_account_id)?
                    }
                    None => MockProvider::with_account(&settings.mock_account_id),
                };
                tracing::info!(provider = provider.provider_code(), "provider ready");
                Ok(Box::new(provider))
            }
            // Add other providers here.
            other => bail!("unknown or disabled provider '{}'", other),
        }
    }
}
