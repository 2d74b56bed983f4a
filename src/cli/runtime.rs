use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;

pub fn init_logging(level: &str) -> Result<()> {
    let level: tracing::Level = level.parse().context("Invalid log level")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

pub fn load_config(config_path: Option<&PathBuf>) -> Result<Config> {
    Config::load(config_path.map(|p| p.as_path()))
}
