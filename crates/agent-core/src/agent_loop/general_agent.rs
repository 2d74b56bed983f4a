//! The general loop: planning, nested browser research, sandboxed commands,
//! and artifact persistence on top of the same bounded turn structure.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use webscout_sandbox::{CommandRequest, ListingOptions, Sandbox};

use crate::browser::BrowserProvider;
use crate::errors::AgentError;
use crate::llm_provider::{ChatMessage, GenerateRequest, LlmProvider};
use crate::tools::{self, general_toolset, ToolInput};
use crate::trace::ToolTrace;
use crate::usage::UsageRecord;

use super::browser_agent::BrowserResearchAgent;
use super::config::LoopConfig;
use super::prompt;
use super::types::{BrowserFindings, GeneralOutcome, Task};

/// Mutable per-run accumulators, kept apart from the loop plumbing.
#[derive(Default)]
struct RunScratch {
    trace: ToolTrace,
    usage: UsageRecord,
    roadmap: Option<String>,
    browser_findings: Vec<BrowserFindings>,
    commands: Vec<webscout_sandbox::CommandOutcome>,
    artifacts: Vec<String>,
}

/// The broader agent variant. Each `browser_research` tool call runs a full
/// inner [`BrowserResearchAgent`] to completion - with its own browser, turn
/// budget, and stop condition - before control returns to this loop; its
/// usage is merged here and its trace is carried as a side channel.
pub struct GeneralAgent {
    llm: Arc<dyn LlmProvider>,
    sandbox: Arc<Sandbox>,
    browsers: Arc<dyn BrowserProvider>,
    config: LoopConfig,
}

impl GeneralAgent {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        sandbox: Arc<Sandbox>,
        browsers: Arc<dyn BrowserProvider>,
    ) -> Self {
        Self {
            llm,
            sandbox,
            browsers,
            config: LoopConfig::general(),
        }
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn run(&self, task: &Task) -> Result<GeneralOutcome, AgentError> {
        let toolset = general_toolset();
        let system = prompt::general_system_prompt(&toolset);
        let mut messages = vec![ChatMessage::user(prompt::general_task_framing(task))];
        let mut scratch = RunScratch::default();
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
            scratch.usage.merge(&response.usage);

            if !response.text.trim().is_empty() {
                messages.push(ChatMessage::assistant(response.text.clone()));
                summary = response.text.clone();
            }

            if let Some(call) = &response.tool_call {
                match tools::validate_for(&toolset, &call.name, &call.arguments) {
                    Ok((tool, input)) => match self.execute(input, &mut scratch).await {
                        Ok(output) => {
                            let step =
                                scratch
                                    .trace
                                    .record(tool, call.arguments.clone(), output.clone());
                            debug!(%tool, step, turn, "tool executed");
                            messages.push(ChatMessage::tool(output.to_string()));
                        }
                        Err(err) if err.is_recoverable() => {
                            warn!(tool = %call.name, %err, "tool execution rejected");
                            messages.push(ChatMessage::tool(format!(
                                "Tool call `{}` rejected: {err}. Correct the input and retry.",
                                call.name
                            )));
                        }
                        Err(err) => return Err(err),
                    },
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

        Ok(GeneralOutcome {
            summary,
            roadmap: scratch.roadmap,
            trace: scratch.trace.into_records(),
            usage: scratch.usage,
            browser_findings: scratch.browser_findings,
            commands: scratch.commands,
            artifacts: scratch.artifacts,
        })
    }

    async fn execute(
        &self,
        input: ToolInput,
        scratch: &mut RunScratch,
    ) -> Result<Value, AgentError> {
        match input {
            ToolInput::Plan { objective } => {
                let response = self
                    .llm
                    .generate(GenerateRequest {
                        system_prompt: None,
                        messages: vec![ChatMessage::user(prompt::plan_prompt(&objective))],
                        tools: Vec::new(),
                    })
                    .await?;
                scratch.usage.merge(&response.usage);
                scratch.roadmap = Some(response.text.clone());
                Ok(json!({ "roadmap": response.text }))
            }
            ToolInput::DesignAutomation {
                prompt: brief,
                channels,
                languages,
            } => {
                let response = self
                    .llm
                    .generate(GenerateRequest {
                        system_prompt: None,
                        messages: vec![ChatMessage::user(prompt::design_prompt(
                            &brief, &channels, &languages,
                        ))],
                        tools: Vec::new(),
                    })
                    .await?;
                scratch.usage.merge(&response.usage);
                Ok(json!({ "design": response.text }))
            }
            ToolInput::BrowserResearch {
                goal,
                url,
                selector,
                max_characters,
            } => {
                let mut sub_task = Task::research(goal.clone(), url.to_string());
                sub_task.selector = selector;
                sub_task.max_characters = max_characters;

                info!(%goal, "starting nested browser research");
                let browser = self.browsers.open().await?;
                let sub_agent = BrowserResearchAgent::new(self.llm.clone(), browser)
                    .with_config(LoopConfig::browser());
                let outcome = sub_agent.run(&sub_task).await?;

                scratch.usage.merge(&outcome.usage);
                let summary = outcome.summary.clone();
                scratch.browser_findings.push(BrowserFindings {
                    goal,
                    summary: outcome.summary,
                    trace: outcome.trace,
                });
                Ok(json!({ "summary": summary }))
            }
            ToolInput::RunCommand {
                command,
                args,
                timeout_ms,
            } => {
                let outcome = self
                    .sandbox
                    .run_command(CommandRequest {
                        command,
                        args,
                        timeout_ms,
                    })
                    .await?;
                scratch.commands.push(outcome.clone());
                to_value(&outcome)
            }
            ToolInput::WriteArtifact { path, content } => {
                let outcome = self.sandbox.write_artifact(&path, &content).await?;
                scratch.artifacts.push(outcome.path.clone());
                to_value(&outcome)
            }
            ToolInput::ReadArtifact { path, max_bytes } => {
                let outcome = self.sandbox.read_artifact(&path, max_bytes).await?;
                to_value(&outcome)
            }
            ToolInput::ListArtifacts {
                path,
                recursive,
                max_entries,
            } => {
                let entries = self
                    .sandbox
                    .list_artifacts(
                        &path,
                        ListingOptions {
                            recursive,
                            max_entries,
                        },
                    )
                    .await?;
                to_value(&entries)
            }
            // Browser-only tools are filtered out by the variant toolset.
            ToolInput::Navigate { .. } => Err(AgentError::UnknownTool("navigate".to_string())),
            ToolInput::ExtractText { .. } => {
                Err(AgentError::UnknownTool("extract_text".to_string()))
            }
            ToolInput::DomSnapshot { .. } => {
                Err(AgentError::UnknownTool("dom_snapshot".to_string()))
            }
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, AgentError> {
    serde_json::to_value(value).map_err(|err| AgentError::execution(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{BrowserCapability, StaticBrowser};
    use crate::llm_provider::{GenerateResponse, ScriptedLlmProvider};
    use crate::tools::ToolId;
    use async_trait::async_trait;

    struct StaticBrowserProvider;

    #[async_trait]
    impl BrowserProvider for StaticBrowserProvider {
        async fn open(&self) -> Result<Arc<dyn BrowserCapability>, AgentError> {
            Ok(Arc::new(StaticBrowser::new().with_page(
                "https://example.com",
                "Example Domain",
                "Example body text for research.",
            )))
        }
    }

    fn fixtures() -> (tempfile::TempDir, Arc<Sandbox>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Arc::new(Sandbox::new(dir.path()).expect("sandbox"));
        (dir, sandbox)
    }

    fn agent(provider: Arc<ScriptedLlmProvider>, sandbox: Arc<Sandbox>) -> GeneralAgent {
        GeneralAgent::new(provider, sandbox, Arc::new(StaticBrowserProvider))
    }

    #[tokio::test]
    async fn plan_and_artifact_turns_accumulate_results() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::tool("plan", json!({"objective": "ship the report"})),
            // Consumed by the plan tool's own model call.
            GenerateResponse::text("1. Research\n2. Write\n3. Review"),
            GenerateResponse::tool(
                "write_artifact",
                json!({"path": "reports/out.md", "content": "# Report\n"}),
            ),
            GenerateResponse::text("DONE: report written."),
        ]));
        let (_dir, sandbox) = fixtures();
        let agent = agent(provider, sandbox);

        let outcome = agent.run(&Task::general("write a report")).await.unwrap();
        assert_eq!(outcome.roadmap.as_deref(), Some("1. Research\n2. Write\n3. Review"));
        assert_eq!(outcome.artifacts, vec!["reports/out.md".to_string()]);
        let steps: Vec<u32> = outcome.trace.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![1, 2]);
        assert!(prompt::contains_completion_marker(&outcome.summary));
    }

    #[tokio::test]
    async fn nested_research_is_a_side_channel_not_a_trace_merge() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::tool(
                "browser_research",
                json!({"goal": "summarise example.com", "url": "https://example.com"}),
            ),
            // Inner loop turns, drained fully before the outer loop resumes.
            GenerateResponse::tool("navigate", json!({"url": "https://example.com"}))
                .with_usage(UsageRecord::from_counters([("input", 5u64)])),
            GenerateResponse::text("DONE: inner summary.")
                .with_usage(UsageRecord::from_counters([("output", 3u64)])),
            // Outer loop resumes here.
            GenerateResponse::text("DONE: research folded in."),
        ]));
        let (_dir, sandbox) = fixtures();
        let agent = agent(provider, sandbox);

        let outcome = agent.run(&Task::general("research then stop")).await.unwrap();

        // Outer trace has exactly one step for the sub-run as a whole.
        assert_eq!(outcome.trace.len(), 1);
        assert_eq!(outcome.trace[0].tool, ToolId::BrowserResearch);

        // The sub-run's own steps stay in the side channel with their own
        // 1-based numbering.
        assert_eq!(outcome.browser_findings.len(), 1);
        let findings = &outcome.browser_findings[0];
        assert_eq!(findings.trace.len(), 1);
        assert_eq!(findings.trace[0].step, 1);
        assert!(findings.summary.contains("inner summary"));

        // Inner usage merged into the outer record.
        assert_eq!(outcome.usage.get("input"), 5);
        assert_eq!(outcome.usage.get("output"), 3);
    }

    #[tokio::test]
    async fn rejected_command_is_recycled_without_a_trace_step() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::tool("run_command", json!({"command": "curl", "args": ["https://x"]})),
            GenerateResponse::text("DONE: gave up on curl."),
        ]));
        let (_dir, sandbox) = fixtures();
        let agent = agent(provider, sandbox);

        let outcome = agent.run(&Task::general("fetch something")).await.unwrap();
        assert!(outcome.trace.is_empty());
        assert!(outcome.commands.is_empty());
    }

    #[tokio::test]
    async fn commands_and_reads_flow_through_the_sandbox() {
        let provider = Arc::new(ScriptedLlmProvider::new(vec![
            GenerateResponse::tool(
                "write_artifact",
                json!({"path": "notes.txt", "content": "hello"}),
            ),
            GenerateResponse::tool("run_command", json!({"command": "ls", "args": ["."]})),
            GenerateResponse::tool("read_artifact", json!({"path": "notes.txt"})),
            GenerateResponse::text("DONE: verified."),
        ]));
        let (_dir, sandbox) = fixtures();
        let agent = agent(provider, sandbox);

        let outcome = agent.run(&Task::general("write and verify")).await.unwrap();
        assert_eq!(outcome.trace.len(), 3);
        assert_eq!(outcome.commands.len(), 1);
        assert_eq!(outcome.commands[0].exit_code, Some(0));
        assert!(outcome.commands[0].stdout.contains("notes.txt"));
        let read_output = &outcome.trace[2].output;
        assert_eq!(read_output["content"], "hello");
    }

    #[tokio::test]
    async fn general_cap_bounds_a_silent_model() {
        let provider = Arc::new(ScriptedLlmProvider::new(Vec::new()));
        let (_dir, sandbox) = fixtures();
        let agent = agent(provider.clone(), sandbox);

        let outcome = agent.run(&Task::general("never finishes")).await.unwrap();
        assert_eq!(provider.calls(), LoopConfig::GENERAL_MAX_STEPS);
        assert!(outcome.trace.is_empty());
    }
}
