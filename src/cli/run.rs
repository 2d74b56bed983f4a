use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::info;

use agent_core::{GeneralAgent, GeneralOutcome, LoopConfig, Task};
use webscout_sandbox::Sandbox;

use crate::browser_impl::FetchBrowserProvider;
use crate::cli::output::{print_json, OutputFormat};
use crate::config::Config;
use crate::llm::{OpenAiConfig, OpenAiProvider};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Objective for the general agent
    #[arg(long)]
    pub goal: String,

    /// Extra context appended to the task framing
    #[arg(long)]
    pub context: Option<String>,

    /// Workspace directory for commands and artifacts
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Model turn cap
    #[arg(long)]
    pub max_steps: Option<u32>,
}

pub async fn cmd_run(args: RunArgs, config: &Config, output: OutputFormat) -> Result<()> {
    let provider = Arc::new(OpenAiProvider::new(OpenAiConfig::from_config(config)?)?);
    let workspace = config.resolve_workspace(args.workspace.as_deref())?;
    let sandbox = Arc::new(Sandbox::new(&workspace)?);
    let browsers = Arc::new(FetchBrowserProvider::new(Duration::from_millis(
        config.navigation_timeout_ms,
    )));

    let mut loop_config = LoopConfig::general();
    if let Some(max_steps) = args.max_steps {
        loop_config = loop_config.with_max_steps(max_steps);
    }

    let mut task = Task::general(&args.goal);
    if let Some(context) = &args.context {
        task = task.with_context(context);
    }

    info!(goal = %args.goal, workspace = %workspace.display(), "starting general run");
    let agent = GeneralAgent::new(provider, sandbox, browsers).with_config(loop_config);
    let outcome = agent.run(&task).await?;

    match output {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Human => {
            print_human(&outcome);
            Ok(())
        }
    }
}

fn print_human(outcome: &GeneralOutcome) {
    println!("{}", outcome.summary);
    if let Some(roadmap) = &outcome.roadmap {
        println!();
        println!("Roadmap:");
        println!("{roadmap}");
    }
    for findings in &outcome.browser_findings {
        println!();
        println!("Research: {}", findings.goal);
        println!("{}", findings.summary);
    }
    if !outcome.commands.is_empty() {
        println!();
        println!("Commands:");
        for command in &outcome.commands {
            let status = if command.timed_out {
                "timed out".to_string()
            } else {
                match command.exit_code {
                    Some(code) => format!("exit {code}"),
                    None => "no exit code".to_string(),
                }
            };
            println!("  {} {} ({status})", command.command, command.args.join(" "));
        }
    }
    if !outcome.artifacts.is_empty() {
        println!();
        println!("Artifacts:");
        for path in &outcome.artifacts {
            println!("  {path}");
        }
    }
    if !outcome.usage.is_empty() {
        println!();
        println!("Usage:");
        for (counter, value) in outcome.usage.counters() {
            println!("  {counter}: {value}");
        }
    }
}
