use clap::Subcommand;

use super::design::DesignArgs;
use super::research::ResearchArgs;
use super::run::RunArgs;
use super::serve::ServeArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Research a page with the browser agent and print a Markdown summary
    Research(ResearchArgs),

    /// Run the general agent with planning, shell, and artifact tools
    Run(RunArgs),

    /// Draft an automation design from a one-shot model call
    Design(DesignArgs),

    /// Serve the session HTTP API
    Serve(ServeArgs),
}
