//! Closed tool set: identifiers, model-facing descriptors, input validation.
//!
//! Dispatch is on [`ToolId`] only. Model-supplied payloads are checked here,
//! field by field, before anything reaches the browser, shell, or filesystem.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use url::Url;

use crate::errors::AgentError;
use webscout_sandbox::{MAX_COMMAND_TIMEOUT_MS, MAX_LIST_ENTRIES, MAX_READ_BYTES};

/// Upper bound on a DOM snapshot wait, in milliseconds.
pub const MAX_SNAPSHOT_TIMEOUT_MS: u64 = 60_000;

/// Every tool either agent variant can dispatch. Closed by construction;
/// a model asking for anything else gets [`AgentError::UnknownTool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    Navigate,
    ExtractText,
    DomSnapshot,
    Plan,
    BrowserResearch,
    DesignAutomation,
    RunCommand,
    WriteArtifact,
    ReadArtifact,
    ListArtifacts,
}

impl ToolId {
    /// Wire name the model uses to request this tool.
    pub fn name(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::ExtractText => "extract_text",
            Self::DomSnapshot => "dom_snapshot",
            Self::Plan => "plan",
            Self::BrowserResearch => "browser_research",
            Self::DesignAutomation => "design_automation",
            Self::RunCommand => "run_command",
            Self::WriteArtifact => "write_artifact",
            Self::ReadArtifact => "read_artifact",
            Self::ListArtifacts => "list_artifacts",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "navigate" => Some(Self::Navigate),
            "extract_text" => Some(Self::ExtractText),
            "dom_snapshot" => Some(Self::DomSnapshot),
            "plan" => Some(Self::Plan),
            "browser_research" => Some(Self::BrowserResearch),
            "design_automation" => Some(Self::DesignAutomation),
            "run_command" => Some(Self::RunCommand),
            "write_artifact" => Some(Self::WriteArtifact),
            "read_artifact" => Some(Self::ReadArtifact),
            "list_artifacts" => Some(Self::ListArtifacts),
            _ => None,
        }
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static, model-facing declaration of one tool. The description is part of
/// the prompt contract and must be accurate about side effects and caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub id: ToolId,
    pub name: String,
    pub description: String,
    /// JSON-schema-shaped parameter declaration, handed verbatim to
    /// providers with native tool-call support.
    pub parameters: Value,
}

impl ToolDescriptor {
    fn new(id: ToolId, description: &str, parameters: Value) -> Self {
        Self {
            id,
            name: id.name().to_string(),
            description: description.to_string(),
            parameters,
        }
    }

    /// Render this tool as a prompt line for providers without native
    /// tool-call plumbing.
    pub fn prompt_block(&self) -> String {
        format!(
            "- {}: {} Parameters: {}",
            self.name, self.description, self.parameters
        )
    }
}

/// Tools available to the narrow browser-research loop.
pub fn browser_toolset() -> Vec<ToolDescriptor> {
    vec![
        descriptor(ToolId::Navigate),
        descriptor(ToolId::ExtractText),
        descriptor(ToolId::DomSnapshot),
    ]
}

/// Tools available to the general loop.
pub fn general_toolset() -> Vec<ToolDescriptor> {
    vec![
        descriptor(ToolId::Plan),
        descriptor(ToolId::BrowserResearch),
        descriptor(ToolId::DesignAutomation),
        descriptor(ToolId::RunCommand),
        descriptor(ToolId::WriteArtifact),
        descriptor(ToolId::ReadArtifact),
        descriptor(ToolId::ListArtifacts),
    ]
}

fn descriptor(id: ToolId) -> ToolDescriptor {
    match id {
        ToolId::Navigate => ToolDescriptor::new(
            id,
            "Load a page in the browser. Requires an absolute http(s) URL.",
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "Absolute URL to open"}
                },
                "required": ["url"]
            }),
        ),
        ToolId::ExtractText => ToolDescriptor::new(
            id,
            "Extract visible text from the current page, optionally scoped to a CSS selector and capped at max_characters. Fails if nothing has been navigated yet.",
            json!({
                "type": "object",
                "properties": {
                    "selector": {"type": "string", "description": "Optional CSS selector"},
                    "max_characters": {"type": "integer", "description": "Positive character budget"}
                }
            }),
        ),
        ToolId::DomSnapshot => ToolDescriptor::new(
            id,
            "Capture the current page HTML. timeout_ms must be a positive integer up to 60000. Fails if nothing has been navigated yet.",
            json!({
                "type": "object",
                "properties": {
                    "timeout_ms": {"type": "integer", "description": "Wait budget in milliseconds, max 60000"}
                }
            }),
        ),
        ToolId::Plan => ToolDescriptor::new(
            id,
            "Produce a step-by-step roadmap for the stated objective. No side effects.",
            json!({
                "type": "object",
                "properties": {
                    "objective": {"type": "string", "description": "What the roadmap should achieve"}
                },
                "required": ["objective"]
            }),
        ),
        ToolId::BrowserResearch => ToolDescriptor::new(
            id,
            "Run a full browser research sub-task against a URL and return its summary. Opens and closes its own browser.",
            json!({
                "type": "object",
                "properties": {
                    "goal": {"type": "string", "description": "Research goal"},
                    "url": {"type": "string", "description": "Absolute URL to research"},
                    "selector": {"type": "string", "description": "Optional CSS selector"},
                    "max_characters": {"type": "integer", "description": "Positive character budget"}
                },
                "required": ["goal", "url"]
            }),
        ),
        ToolId::DesignAutomation => ToolDescriptor::new(
            id,
            "Draft an automation design for the given prompt, channels, and languages. One model call, no side effects.",
            json!({
                "type": "object",
                "properties": {
                    "prompt": {"type": "string", "description": "What to design"},
                    "channels": {"type": "array", "items": {"type": "string"}},
                    "languages": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["prompt"]
            }),
        ),
        ToolId::RunCommand => ToolDescriptor::new(
            id,
            "Run an allow-listed command inside the workspace. timeout_ms positive, max 300000. Output is truncated.",
            json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "Executable name, no path"},
                    "args": {"type": "array", "items": {"type": "string"}},
                    "timeout_ms": {"type": "integer", "description": "Wall-clock budget in milliseconds, max 300000"}
                },
                "required": ["command"]
            }),
        ),
        ToolId::WriteArtifact => ToolDescriptor::new(
            id,
            "Write a file inside the workspace, creating parent directories. Overwrites existing content.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Workspace-relative path"},
                    "content": {"type": "string"}
                },
                "required": ["path", "content"]
            }),
        ),
        ToolId::ReadArtifact => ToolDescriptor::new(
            id,
            "Read a workspace file. max_bytes positive, capped at 200000; longer files are truncated.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Workspace-relative path"},
                    "max_bytes": {"type": "integer", "description": "Byte budget, max 200000"}
                },
                "required": ["path"]
            }),
        ),
        ToolId::ListArtifacts => ToolDescriptor::new(
            id,
            "List workspace entries. max_entries positive, capped at 200; recursive mode descends into directories.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Workspace-relative directory, defaults to ."},
                    "recursive": {"type": "boolean"},
                    "max_entries": {"type": "integer", "description": "Entry cap, max 200"}
                }
            }),
        ),
    }
}

/// A tool input that passed validation, carried as typed data from the
/// validator to the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    Navigate {
        url: Url,
    },
    ExtractText {
        selector: Option<String>,
        max_characters: Option<u32>,
    },
    DomSnapshot {
        timeout_ms: Option<u64>,
    },
    Plan {
        objective: String,
    },
    BrowserResearch {
        goal: String,
        url: Url,
        selector: Option<String>,
        max_characters: Option<u32>,
    },
    DesignAutomation {
        prompt: String,
        channels: Vec<String>,
        languages: Vec<String>,
    },
    RunCommand {
        command: String,
        args: Vec<String>,
        timeout_ms: Option<u64>,
    },
    WriteArtifact {
        path: String,
        content: String,
    },
    ReadArtifact {
        path: String,
        max_bytes: Option<u64>,
    },
    ListArtifacts {
        path: String,
        recursive: bool,
        max_entries: Option<usize>,
    },
}

/// Validate a raw model payload against the declared shape for `tool`.
pub fn validate(tool: ToolId, raw: &Value) -> Result<ToolInput, AgentError> {
    let obj = as_object(raw)?;
    match tool {
        ToolId::Navigate => Ok(ToolInput::Navigate {
            url: require_url(obj, "url")?,
        }),
        ToolId::ExtractText => Ok(ToolInput::ExtractText {
            selector: opt_string(obj, "selector")?,
            max_characters: opt_positive_u32(obj, "max_characters")?,
        }),
        ToolId::DomSnapshot => Ok(ToolInput::DomSnapshot {
            timeout_ms: opt_positive_capped(obj, "timeout_ms", MAX_SNAPSHOT_TIMEOUT_MS)?,
        }),
        ToolId::Plan => Ok(ToolInput::Plan {
            objective: require_string(obj, "objective")?,
        }),
        ToolId::BrowserResearch => Ok(ToolInput::BrowserResearch {
            goal: require_string(obj, "goal")?,
            url: require_url(obj, "url")?,
            selector: opt_string(obj, "selector")?,
            max_characters: opt_positive_u32(obj, "max_characters")?,
        }),
        ToolId::DesignAutomation => Ok(ToolInput::DesignAutomation {
            prompt: require_string(obj, "prompt")?,
            channels: opt_string_array(obj, "channels")?,
            languages: opt_string_array(obj, "languages")?,
        }),
        ToolId::RunCommand => Ok(ToolInput::RunCommand {
            command: require_string(obj, "command")?,
            args: opt_string_array(obj, "args")?,
            timeout_ms: opt_positive_capped(obj, "timeout_ms", MAX_COMMAND_TIMEOUT_MS)?,
        }),
        ToolId::WriteArtifact => Ok(ToolInput::WriteArtifact {
            path: require_string(obj, "path")?,
            content: require_string_allow_empty(obj, "content")?,
        }),
        ToolId::ReadArtifact => Ok(ToolInput::ReadArtifact {
            path: require_string(obj, "path")?,
            max_bytes: opt_positive_capped(obj, "max_bytes", MAX_READ_BYTES)?,
        }),
        ToolId::ListArtifacts => Ok(ToolInput::ListArtifacts {
            path: opt_string(obj, "path")?.unwrap_or_else(|| ".".to_string()),
            recursive: opt_bool(obj, "recursive")?.unwrap_or(false),
            max_entries: opt_positive_capped(obj, "max_entries", MAX_LIST_ENTRIES as u64)?
                .map(|n| n as usize),
        }),
    }
}

/// Resolve a model-supplied tool name, then validate its payload.
pub fn validate_named(name: &str, raw: &Value) -> Result<(ToolId, ToolInput), AgentError> {
    let tool = ToolId::parse(name).ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;
    Ok((tool, validate(tool, raw)?))
}

/// Like [`validate_named`], but scoped to one agent variant's toolset: a
/// tool outside `toolset` is unknown to that variant even when the id
/// itself parses.
pub fn validate_for(
    toolset: &[ToolDescriptor],
    name: &str,
    raw: &Value,
) -> Result<(ToolId, ToolInput), AgentError> {
    let (tool, input) = validate_named(name, raw)?;
    if !toolset.iter().any(|descriptor| descriptor.id == tool) {
        return Err(AgentError::UnknownTool(name.to_string()));
    }
    Ok((tool, input))
}

fn as_object(raw: &Value) -> Result<&Map<String, Value>, AgentError> {
    raw.as_object()
        .ok_or_else(|| AgentError::validation("input", "must be a JSON object"))
}

fn require_string(obj: &Map<String, Value>, field: &str) -> Result<String, AgentError> {
    let value = require_string_allow_empty(obj, field)?;
    if value.trim().is_empty() {
        return Err(AgentError::validation(field, "must not be empty"));
    }
    Ok(value)
}

fn require_string_allow_empty(obj: &Map<String, Value>, field: &str) -> Result<String, AgentError> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(AgentError::validation(field, "must be a string")),
        None => Err(AgentError::validation(field, "is required")),
    }
}

fn opt_string(obj: &Map<String, Value>, field: &str) -> Result<Option<String>, AgentError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(AgentError::validation(field, "must be a string")),
    }
}

fn opt_bool(obj: &Map<String, Value>, field: &str) -> Result<Option<bool>, AgentError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(AgentError::validation(field, "must be a boolean")),
    }
}

fn opt_string_array(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, AgentError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| AgentError::validation(field, "must be an array of strings"))
            })
            .collect(),
        Some(_) => Err(AgentError::validation(field, "must be an array of strings")),
    }
}

fn opt_positive(obj: &Map<String, Value>, field: &str) -> Result<Option<u64>, AgentError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => match value.as_u64() {
            Some(n) if n > 0 => Ok(Some(n)),
            _ => Err(AgentError::validation(field, "must be a positive integer")),
        },
    }
}

fn opt_positive_capped(
    obj: &Map<String, Value>,
    field: &str,
    cap: u64,
) -> Result<Option<u64>, AgentError> {
    match opt_positive(obj, field)? {
        Some(n) if n > cap => Err(AgentError::validation(
            field,
            format!("must be a positive integer <= {cap}"),
        )),
        other => Ok(other),
    }
}

fn opt_positive_u32(obj: &Map<String, Value>, field: &str) -> Result<Option<u32>, AgentError> {
    opt_positive_capped(obj, field, u32::MAX as u64).map(|n| n.map(|n| n as u32))
}

fn require_url(obj: &Map<String, Value>, field: &str) -> Result<Url, AgentError> {
    let raw = require_string(obj, field)?;
    let url = Url::parse(&raw)
        .map_err(|_| AgentError::validation(field, "must be an absolute URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AgentError::validation(field, "must use http or https"));
    }
    Ok(url)
}
