use anyhow::Result;

use super::commands::Commands;
use super::design::cmd_design;
use super::env::CliArgs;
use super::research::cmd_research;
use super::run::cmd_run;
use super::serve::cmd_serve;
use crate::config::Config;

pub async fn dispatch(cli: &CliArgs, config: &Config) -> Result<()> {
    match cli.command.clone() {
        Commands::Research(args) => cmd_research(args, config, cli.output).await,
        Commands::Run(args) => cmd_run(args, config, cli.output).await,
        Commands::Design(args) => cmd_design(args, config, cli.output).await,
        Commands::Serve(args) => cmd_serve(args, config).await,
    }
}
