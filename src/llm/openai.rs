//! OpenAI-compatible chat-completions provider with native tool calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use agent_core::{
    AgentError, ChatMessage, GenerateRequest, GenerateResponse, LlmProvider, Role, ToolCallRequest,
    UsageRecord,
};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn from_config(config: &Config) -> Result<Self, AgentError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AgentError::llm("missing API key for model provider"))?;
        Ok(Self {
            api_key,
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }
}

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| AgentError::llm(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AgentError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            messages: wire_messages(&request),
            tools: wire_tools(&request),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AgentError::llm(format!("chat completion request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<response unavailable>".to_string());
            return Err(AgentError::llm(format!(
                "model backend returned {status}: {text}"
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| AgentError::llm(format!("invalid chat completion response: {err}")))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::llm("chat completion response had no choices"))?;

        let tool_call = match choice.message.tool_calls.into_iter().next() {
            Some(call) => Some(parse_tool_call(call)?),
            None => None,
        };

        Ok(GenerateResponse {
            text: choice.message.content.unwrap_or_default(),
            tool_call,
            usage: completion.usage.map(usage_record).unwrap_or_default(),
        })
    }
}

fn wire_messages(request: &GenerateRequest) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system_prompt {
        messages.push(WireMessage {
            role: "system",
            content: system.clone(),
        });
    }
    messages.extend(request.messages.iter().map(wire_message));
    messages
}

// The loop's tool results carry no call ids, so they ride as user turns
// instead of the protocol's tool role.
fn wire_message(message: &ChatMessage) -> WireMessage {
    match message.role {
        Role::System => WireMessage {
            role: "system",
            content: message.content.clone(),
        },
        Role::User => WireMessage {
            role: "user",
            content: message.content.clone(),
        },
        Role::Assistant => WireMessage {
            role: "assistant",
            content: message.content.clone(),
        },
        Role::Tool => WireMessage {
            role: "user",
            content: format!("Tool result:\n{}", message.content),
        },
    }
}

fn wire_tools(request: &GenerateRequest) -> Option<Vec<WireTool>> {
    if request.tools.is_empty() {
        return None;
    }
    Some(
        request
            .tools
            .iter()
            .map(|descriptor| WireTool {
                kind: "function",
                function: WireFunction {
                    name: descriptor.name.clone(),
                    description: descriptor.description.clone(),
                    parameters: descriptor.parameters.clone(),
                },
            })
            .collect(),
    )
}

fn parse_tool_call(call: WireToolCall) -> Result<ToolCallRequest, AgentError> {
    let arguments: Value = serde_json::from_str(&call.function.arguments).map_err(|err| {
        warn!(tool = %call.function.name, %err, "model emitted unparseable tool arguments");
        AgentError::llm(format!(
            "tool call `{}` carried invalid JSON arguments: {err}",
            call.function.name
        ))
    })?;
    Ok(ToolCallRequest {
        name: call.function.name,
        arguments,
    })
}

fn usage_record(usage: WireUsage) -> UsageRecord {
    let mut record = UsageRecord::new();
    record.set(UsageRecord::INPUT, usage.prompt_tokens);
    record.set(UsageRecord::OUTPUT, usage.completion_tokens);
    record.set(UsageRecord::TOTAL, usage.total_tokens);
    if let Some(details) = usage.prompt_tokens_details {
        record.set(UsageRecord::CACHED, details.cached_tokens);
    }
    record
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireToolCallFunction,
}

#[derive(Deserialize)]
struct WireToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Clone)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
    #[serde(default)]
    prompt_tokens_details: Option<WirePromptDetails>,
}

#[derive(Deserialize, Clone)]
struct WirePromptDetails {
    #[serde(default)]
    cached_tokens: u64,
}
