//! Model capability seam and the deterministic provider used in tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AgentError;
use crate::tools::ToolDescriptor;
use crate::usage::UsageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in the conversation fed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

/// Everything the model needs for one generation turn.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDescriptor>,
}

/// A tool invocation the model asked for, still untrusted at this point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Value,
}

/// One model turn: free text, at most one tool call, and the usage it cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
    pub tool_call: Option<ToolCallRequest>,
    pub usage: UsageRecord,
}

impl GenerateResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            tool_call: None,
            usage: UsageRecord::new(),
        }
    }

    pub fn tool(name: &str, arguments: Value) -> Self {
        Self {
            text: String::new(),
            tool_call: Some(ToolCallRequest {
                name: name.to_string(),
                arguments,
            }),
            usage: UsageRecord::new(),
        }
    }

    pub fn with_usage(mut self, usage: UsageRecord) -> Self {
        self.usage = usage;
        self
    }
}

/// Abstraction over text-generation backends. The loop depends only on
/// per-call usage counters, named tool-call requests, and the ability to
/// feed tool results back as conversation context.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AgentError>;
}

/// Deterministic provider replaying a fixed script of turns.
///
/// Once the script is exhausted it keeps returning the fallback response,
/// which by default never signals completion, so step-cap behaviour can be
/// exercised directly.
pub struct ScriptedLlmProvider {
    turns: Mutex<VecDeque<GenerateResponse>>,
    fallback: GenerateResponse,
    calls: AtomicU32,
}

impl ScriptedLlmProvider {
    pub fn new(turns: Vec<GenerateResponse>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            fallback: GenerateResponse::text("Still gathering information."),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_fallback(mut self, fallback: GenerateResponse) -> Self {
        self.fallback = fallback;
        self
    }

    /// Number of generation calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlmProvider {
    async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.turns.lock().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}
