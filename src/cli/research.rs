use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use tracing::info;

use agent_core::{BrowserResearchAgent, LoopConfig, RunOutcome, Task};

use crate::browser_impl::FetchBrowser;
use crate::cli::output::{print_json, OutputFormat};
use crate::config::Config;
use crate::llm::{OpenAiConfig, OpenAiProvider};

#[derive(Args, Debug, Clone)]
pub struct ResearchArgs {
    /// Research goal
    #[arg(long)]
    pub goal: String,

    /// Target URL
    #[arg(long)]
    pub url: String,

    /// CSS selector hint for text extraction
    #[arg(long)]
    pub selector: Option<String>,

    /// Character budget for extracted text
    #[arg(long)]
    pub max_characters: Option<u32>,

    /// Model turn cap
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Skip the final reflection pass
    #[arg(long)]
    pub no_reflect: bool,
}

pub async fn cmd_research(args: ResearchArgs, config: &Config, output: OutputFormat) -> Result<()> {
    let provider = Arc::new(OpenAiProvider::new(OpenAiConfig::from_config(config)?)?);
    let browser = Arc::new(FetchBrowser::new(Duration::from_millis(
        config.navigation_timeout_ms,
    ))?);

    let mut loop_config = LoopConfig::browser();
    if let Some(max_steps) = args.max_steps {
        loop_config = loop_config.with_max_steps(max_steps);
    }
    if args.no_reflect {
        loop_config = loop_config.with_reflection(false);
    }

    let mut task = Task::research(&args.goal, &args.url);
    if let Some(selector) = &args.selector {
        task = task.with_selector(selector);
    }
    if let Some(max_characters) = args.max_characters {
        task = task.with_max_characters(max_characters);
    }

    info!(goal = %args.goal, url = %args.url, "starting browser research");
    let agent = BrowserResearchAgent::new(provider, browser).with_config(loop_config);
    let outcome = agent.run(&task).await?;

    match output {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Human => {
            print_human(&outcome);
            Ok(())
        }
    }
}

fn print_human(outcome: &RunOutcome) {
    println!("{}", outcome.summary);
    if !outcome.trace.is_empty() {
        println!();
        println!("Steps:");
        for record in &outcome.trace {
            println!("  {}. {}", record.step, record.tool);
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
