//! Derivatives market-making engine - Entry Point
//!
//! Replays a captured feed through the quoting loop against a paper
//! gateway. Point `feed.replay_path` at a live bridge's output to run
//! against fresher data.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Derivatives market-making engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DMM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    dmm_telemetry::init_logging()?;

    info!("Starting dmm v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > DMM_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("DMM_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = if std::path::Path::new(&config_path).exists() {
        dmm_bot::AppConfig::from_file(&config_path)?
    } else {
        tracing::warn!(path = %config_path, "Config file not found, using defaults");
        dmm_bot::AppConfig::default()
    };
    info!(
        instrument = %config.instrument.name,
        replay_path = %config.feed.replay_path,
        "Configuration loaded"
    );

    // Create and run the application
    let app = dmm_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
