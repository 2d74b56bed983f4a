//! End-to-end general-agent run against a scripted model: plan, delegate a
//! browser research sub-run, execute a workspace command, persist an
//! artifact, and finish on the completion marker.

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use agent_core::{
    AgentError, BrowserCapability, BrowserProvider, GeneralAgent, GenerateResponse,
    ScriptedLlmProvider, StaticBrowser, Task, ToolId,
};
use webscout_sandbox::Sandbox;

struct StaticProvider;

#[async_trait::async_trait]
impl BrowserProvider for StaticProvider {
    async fn open(&self) -> Result<Arc<dyn BrowserCapability>, AgentError> {
        Ok(Arc::new(StaticBrowser::new().with_page(
            "https://example.com/pricing",
            "Pricing",
            "Starter tier is free. Growth tier is 49 dollars per month.",
        )))
    }
}

#[tokio::test]
async fn scripted_run_plans_researches_executes_and_persists() {
    let workspace = TempDir::new().unwrap();
    let sandbox = Arc::new(Sandbox::new(workspace.path()).unwrap());

    // Outer turns interleave with the nested browser run, which drains the
    // same script before the outer loop resumes.
    let llm = Arc::new(ScriptedLlmProvider::new(vec![
        GenerateResponse::tool("plan", json!({"objective": "Compare pricing tiers"})),
        GenerateResponse::text("1. Read the pricing page\n2. Record findings"),
        GenerateResponse::tool(
            "browser_research",
            json!({"goal": "Find the tier prices", "url": "https://example.com/pricing"}),
        ),
        // Nested browser loop starts here.
        GenerateResponse::tool("navigate", json!({"url": "https://example.com/pricing"})),
        GenerateResponse::text("DONE: starter is free, growth is $49/month."),
        // Back in the outer loop.
        GenerateResponse::tool(
            "run_command",
            json!({"command": "mkdir", "args": ["reports"]}),
        ),
        GenerateResponse::tool(
            "write_artifact",
            json!({"path": "reports/pricing.md", "content": "# Pricing\nstarter free, growth $49"}),
        ),
        GenerateResponse::text("DONE: findings written to reports/pricing.md."),
    ]));

    let agent = GeneralAgent::new(llm.clone(), sandbox.clone(), Arc::new(StaticProvider));
    let outcome = agent
        .run(&Task::general("Compare pricing tiers and save a report"))
        .await
        .unwrap();

    assert!(outcome.summary.starts_with("DONE:"));
    assert_eq!(
        outcome.roadmap.as_deref(),
        Some("1. Read the pricing page\n2. Record findings")
    );

    // Outer trace numbers only the outer steps; the sub-run keeps its own.
    let tools: Vec<ToolId> = outcome.trace.iter().map(|r| r.tool).collect();
    assert_eq!(
        tools,
        vec![
            ToolId::Plan,
            ToolId::BrowserResearch,
            ToolId::RunCommand,
            ToolId::WriteArtifact,
        ]
    );
    let steps: Vec<u32> = outcome.trace.iter().map(|r| r.step).collect();
    assert_eq!(steps, vec![1, 2, 3, 4]);

    assert_eq!(outcome.browser_findings.len(), 1);
    assert_eq!(outcome.browser_findings[0].trace.len(), 1);
    assert_eq!(outcome.browser_findings[0].trace[0].step, 1);

    assert_eq!(outcome.commands.len(), 1);
    assert_eq!(outcome.commands[0].exit_code, Some(0));

    assert_eq!(outcome.artifacts, vec!["reports/pricing.md".to_string()]);
    let written = std::fs::read_to_string(workspace.path().join("reports/pricing.md")).unwrap();
    assert!(written.contains("growth $49"));
}

#[tokio::test]
async fn disallowed_command_is_recycled_and_the_run_still_finishes() {
    let workspace = TempDir::new().unwrap();
    let sandbox = Arc::new(Sandbox::new(workspace.path()).unwrap());

    let llm = Arc::new(ScriptedLlmProvider::new(vec![
        GenerateResponse::tool("run_command", json!({"command": "curl", "args": ["https://x"]})),
        GenerateResponse::text("DONE: unable to download, nothing else to do."),
    ]));

    let agent = GeneralAgent::new(llm, sandbox, Arc::new(StaticProvider));
    let outcome = agent
        .run(&Task::general("Download a file"))
        .await
        .unwrap();

    assert!(outcome.summary.starts_with("DONE:"));
    assert!(outcome.trace.is_empty());
    assert!(outcome.commands.is_empty());
}
