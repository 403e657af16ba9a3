//! Aqualog - Main Entry Point

use api::{init_logging, run, Settings};
use std::path::PathBuf;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional explicit config path; otherwise ./aqualog.toml if present
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;
    init_logging(&settings.log)?;

    info!("=== Aqualog v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Feed: {:?}, store key '{}'", settings.feed.kind, settings.storage.key);

    run(settings).await?;

    Ok(())
}
