//! ADARCA - Main Entry Point

use api::config::AppConfig;
use api::{init_logging, run_server};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Power outage webhook orchestrator
#[derive(Parser, Debug)]
#[command(name = "adarca")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Power outage webhook orchestrator", long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "ADARCA_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;
    init_logging(&config.logger)?;

    info!("=== ADARCA v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from {}", args.config.display());

    run_server(config).await
}
