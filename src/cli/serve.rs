use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::browser_impl::FetchBrowserProvider;
use crate::config::Config;
use crate::llm::{OpenAiConfig, OpenAiProvider};
use crate::server;
use crate::sessions::{SessionService, SessionServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn cmd_serve(args: ServeArgs, config: &Config) -> Result<()> {
    let provider = Arc::new(OpenAiProvider::new(OpenAiConfig::from_config(config)?)?);
    let browsers = Arc::new(FetchBrowserProvider::new(Duration::from_millis(
        config.navigation_timeout_ms,
    )));
    let sessions = SessionService::new(provider, browsers, SessionServiceConfig::default());

    let port = args.port.unwrap_or(config.port);
    server::serve(sessions, port).await
}
