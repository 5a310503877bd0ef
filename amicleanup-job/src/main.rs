use std::io::Read;

use amicleanup_common::CleanupEvent;
use amicleanup_job::provider_manager::ProviderManager;
use amicleanup_job::{handle_event, Settings};
use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

/// Reads the trigger payload from the file named on the command line, or stdin for `-`
/// or no argument.
fn read_event(arg: Option<String>) -> Result<CleanupEvent> {
    let raw = match arg.as_deref() {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read event from stdin")?;
            buf
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read event file {}", path))?,
    };
    CleanupEvent::from_json(&raw).context("invalid cleanup event")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Logs go to stderr; stdout carries only the JSON report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    let event = read_event(std::env::args().nth(1))?;
    let provider = ProviderManager::get_provider(&settings)?;

    let report = handle_event(provider.as_ref(), &settings, &event).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let failed = report.deletions.failures().count();
    if failed > 0 {
        bail!("{} deletion(s) failed; they will be retried on the next run", failed);
    }
    Ok(())
}
