use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::dispatch::dispatch;
use super::env::CliArgs;
use super::runtime::{init_logging, load_config};

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    init_logging(&cli.log_level)?;
    info!("Starting webscout v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_ref())?;

    match dispatch(&cli, &config).await {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}
