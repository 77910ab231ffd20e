//! Clinic Dialysis Pipeline - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== Clinic Dialysis Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    run_server(settings).await?;

    Ok(())
}
