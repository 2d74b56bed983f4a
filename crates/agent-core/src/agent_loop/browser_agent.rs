//! The narrow browser-research loop.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::browser::BrowserCapability;
use crate::errors::AgentError;
use crate::llm_provider::{ChatMessage, GenerateRequest, LlmProvider};
use crate::tools::{self, browser_toolset, ToolId, ToolInput};
use crate::trace::ToolTrace;
use crate::usage::UsageRecord;

use super::config::LoopConfig;
use super::prompt::{self, COMPLETION_MARKER};
use super::types::{RunOutcome, Task};

/// Drives navigate/extract/snapshot turns against one browser instance until
/// the model signals completion or the turn cap fires.
///
/// The browser is closed exactly once when the run ends, on success and on
/// failure alike.
pub struct BrowserResearchAgent {
    llm: Arc<dyn LlmProvider>,
    browser: Arc<dyn BrowserCapability>,
    config: LoopConfig,
}

impl BrowserResearchAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, browser: Arc<dyn BrowserCapability>) -> Self {
        Self {
            llm,
            browser,
            config: LoopConfig::browser(),
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn run(&self, task: &Task) -> Result<RunOutcome, AgentError> {
        let result = self.drive(task).await;
        if let Err(err) = self.browser.close().await {
            warn!(%err, "browser close failed");
        }
        result
    }

    async fn drive(&self, task: &Task) -> Result<RunOutcome, AgentError> {
        let toolset = browser_toolset();
        let system = prompt::browser_system_prompt(&toolset);
        let mut messages = vec![ChatMessage::user(prompt::browser_task_framing(task))];
        let mut trace = ToolTrace::new();
        let mut usage = UsageRecord::new();
        let mut summary = String::new();

        for turn in 1..=self.config.max_steps {
            let response = self
                .llm
                .generate(GenerateRequest {
                    system_prompt: Some(system.clone()),
                    messages: messages.clone(),
                    tools: toolset.clone(),
                })
                .await?;
            usage.merge(&response.usage);

            if !response.text.trim().is_empty() {
                messages.push(ChatMessage::assistant(response.text.clone()));
                summary = response.text.clone();
            }

            if let Some(call) = &response.tool_call {
                match tools::validate_for(&toolset, &call.name, &call.arguments) {
                    Ok((tool, input)) => {
                        let output = self.execute(tool, input).await?;
                        let step = trace.record(tool, call.arguments.clone(), output.clone());
                        debug!(%tool, step, turn, "tool executed");
                        messages.push(ChatMessage::tool(output.to_string()));
                    }
                    Err(err) if err.is_recoverable() => {
                        warn!(tool = %call.name, %err, "tool call rejected");
                        messages.push(ChatMessage::tool(format!(
                            "Tool call `{}` rejected: {err}. Correct the input and retry.",
                            call.name
                        )));
                    }
                    Err(err) => return Err(err),
                }
            }

            if prompt::contains_completion_marker(&response.text) {
                break;
            }
        }

        if self.config.reflect {
            summary = self.reflect(task, &trace, summary, &mut usage).await?;
        }

        Ok(RunOutcome {
            summary,
            trace: trace.into_records(),
            usage,
        })
    }

    async fn execute(&self, tool: ToolId, input: ToolInput) -> Result<Value, AgentError> {
        match input {
            ToolInput::Navigate { url } => {
                let location = self.browser.navigate(url.as_str()).await?;
                to_value(&location)
            }
            ToolInput::ExtractText {
                selector,
                max_characters,
            } => {
                let extracted = self
                    .browser
                    .extract_text(selector.as_deref(), max_characters)
                    .await?;
                to_value(&extracted)
            }
            ToolInput::DomSnapshot { timeout_ms } => {
                let html = match timeout_ms {
                    Some(ms) => {
                        tokio::time::timeout(Duration::from_millis(ms), self.browser.dom_snapshot())
                            .await
                            .map_err(|_| AgentError::timeout("dom snapshot"))??
                    }
                    None => self.browser.dom_snapshot().await?,
                };
                Ok(json!({ "html": html }))
            }
            _ => Err(AgentError::UnknownTool(tool.name().to_string())),
        }
    }

    /// Single-shot review of the draft summary. A draft already carrying the
    /// completion marker is returned untouched; the pass never re-enters the
    /// tool loop, and a marker-less reflection gets a synthetic closing line.
    async fn reflect(
        &self,
        task: &Task,
        trace: &ToolTrace,
        draft: String,
        usage: &mut UsageRecord,
    ) -> Result<String, AgentError> {
        if prompt::contains_completion_marker(&draft) {
            return Ok(draft);
        }

        let transcript = render_transcript(trace);
        let response = self
            .llm
            .generate(GenerateRequest {
                system_prompt: None,
                messages: vec![ChatMessage::user(prompt::reflection_prompt(
                    &task.goal,
                    &transcript,
                    &draft,
                ))],
                tools: Vec::new(),
            })
            .await?;
        usage.merge(&response.usage);

        let mut summary = if response.text.trim().is_empty() {
            draft
        } else {
            response.text
        };
        if !prompt::contains_completion_marker(&summary) {
            summary.push_str(&format!("\n{COMPLETION_MARKER} summary above."));
        }
        Ok(summary)
    }
}

fn render_transcript(trace: &ToolTrace) -> String {
    trace
        .records()
        .iter()
        .map(|record| {
            format!(
                "{}. {} input={} output={}",
                record.step, record.tool, record.input, record.output
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, AgentError> {
    serde_json::to_value(value).map_err(|err| AgentError::execution(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::StaticBrowser;
    use crate::llm_provider::{GenerateResponse, ScriptedLlmProvider};

    fn example_browser() -> Arc<StaticBrowser> {
        Arc::new(StaticBrowser::new().with_page(
            "https://example.com",
            "Example Domain",
            "Example body text for research.",
        ))
    }

    fn task() -> Task {
        Task::research("Summarise the homepage", "https://example.com")
    }

    #[tokio::test]
    async fn early_completion_produces_single_trace_entry() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::tool("navigate", json!({"url": "https://example.com"})),
            GenerateResponse::text("The homepage is minimal.\nDONE: homepage summarised."),
        ]));
        let browser = example_browser();
        let agent = BrowserResearchAgent::new(provider.clone(), browser.clone())
            .with_config(LoopConfig::browser().with_max_steps(3));

        let outcome = agent.run(&task()).await.unwrap();
        assert_eq!(outcome.trace.len(), 1);
        assert_eq!(outcome.trace[0].tool, ToolId::Navigate);
        assert!(prompt::contains_completion_marker(&outcome.summary));
        // Marker already present, so reflection makes no extra model call.
        assert_eq!(provider.calls(), 2);
        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn never_completing_model_stops_at_the_cap() {
        let provider = Arc::new(ScriptedLlmProvider::new(Vec::new()));
        let agent = BrowserResearchAgent::new(provider.clone(), example_browser())
            .with_config(LoopConfig::browser().with_reflection(false));

        let outcome = agent.run(&task()).await.unwrap();
        assert_eq!(provider.calls(), LoopConfig::BROWSER_MAX_STEPS);
        assert!(outcome.trace.is_empty());
    }

    #[tokio::test]
    async fn validation_failure_is_recycled_and_consumes_no_step() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::tool("navigate", json!({"url": "not-a-url"})),
            GenerateResponse::tool("navigate", json!({"url": "https://example.com"})),
            GenerateResponse::text("DONE: summarised after a retry."),
        ]));
        let agent = BrowserResearchAgent::new(provider, example_browser());

        let outcome = agent.run(&task()).await.unwrap();
        let steps: Vec<u32> = outcome.trace.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![1]);
    }

    #[tokio::test]
    async fn out_of_set_tool_is_recycled_as_unknown() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::tool("run_command", json!({"command": "ls"})),
            GenerateResponse::text("DONE: gave up on shells."),
        ]));
        let agent = BrowserResearchAgent::new(provider, example_browser());

        let outcome = agent.run(&task()).await.unwrap();
        assert!(outcome.trace.is_empty());
    }

    #[tokio::test]
    async fn executor_failure_propagates_and_still_closes_browser() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![GenerateResponse::tool(
            "navigate",
            json!({"url": "https://nowhere.invalid"}),
        )]));
        let browser = example_browser();
        let agent = BrowserResearchAgent::new(provider, browser.clone());

        let err = agent.run(&task()).await.unwrap_err();
        assert!(matches!(err, AgentError::Execution(_)));
        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn reflection_appends_synthetic_marker_when_missing() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::text("partial notes, not finished"),
            GenerateResponse::text("Improved summary, still no sentinel"),
        ]));
        let agent = BrowserResearchAgent::new(provider.clone(), example_browser())
            .with_config(LoopConfig::browser().with_max_steps(1));

        let outcome = agent.run(&task()).await.unwrap();
        assert!(outcome.summary.starts_with("Improved summary"));
        assert!(prompt::contains_completion_marker(&outcome.summary));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn usage_accumulates_across_turns() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::tool("navigate", json!({"url": "https://example.com"}))
                .with_usage(UsageRecord::from_counters([("input", 10u64), ("output", 2)])),
            GenerateResponse::text("DONE: summarised.")
                .with_usage(UsageRecord::from_counters([("input", 4u64), ("output", 6)])),
        ]));
        let agent = BrowserResearchAgent::new(provider, example_browser());

        let outcome = agent.run(&task()).await.unwrap();
        assert_eq!(outcome.usage.get("input"), 14);
        assert_eq!(outcome.usage.get("output"), 8);
    }
}
