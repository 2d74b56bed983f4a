use anyhow::Result;
use clap::Args;
use serde_json::json;

use agent_core::agent_loop::prompt::design_prompt;
use agent_core::{ChatMessage, GenerateRequest, LlmProvider};

use crate::cli::output::{print_json, OutputFormat};
use crate::config::Config;
use crate::llm::{OpenAiConfig, OpenAiProvider};

#[derive(Args, Debug, Clone)]
pub struct DesignArgs {
    /// What the automation should accomplish
    #[arg(long)]
    pub prompt: String,

    /// Delivery channel to target (repeatable)
    #[arg(long = "channel", value_name = "NAME")]
    pub channels: Vec<String>,

    /// Output language to cover (repeatable)
    #[arg(long = "language", value_name = "NAME")]
    pub languages: Vec<String>,
}

pub async fn cmd_design(args: DesignArgs, config: &Config, output: OutputFormat) -> Result<()> {
    let provider = OpenAiProvider::new(OpenAiConfig::from_config(config)?)?;
    let request = GenerateRequest {
        system_prompt: None,
        messages: vec![ChatMessage::user(design_prompt(
            &args.prompt,
            &args.channels,
            &args.languages,
        ))],
        tools: Vec::new(),
    };
    let response = provider.generate(request).await?;

    match output {
        OutputFormat::Json => print_json(&json!({
            "design": response.text,
            "usage": response.usage,
        })),
        OutputFormat::Human => {
            println!("{}", response.text);
            Ok(())
        }
    }
}
