//! TubeSense web server entry point.

use tracing::info;
use tubesense_core::TubesenseConfig;
use tubesense_web::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("TUBESENSE_CONFIG").map(std::path::PathBuf::from);
    let config = TubesenseConfig::resolve(config_path.as_deref())?;
    init_tracing(&config.logging, 0)?;

    info!("Starting TubeSense web server...");
    tubesense_web::serve(config).await?;
    Ok(())
}
