//! Agent core: the bounded model↔tool loop and everything it leans on.
//!
//! The crate is organised leaves-first:
//! - [`tools`] declares the closed tool set and validates model-supplied input
//! - [`usage`] and [`trace`] aggregate telemetry across (possibly nested) runs
//! - [`browser`] and [`llm_provider`] are the capability seams; deterministic
//!   implementations for tests live next to each trait
//! - [`agent_loop`] drives the turns and guarantees termination

pub mod agent_loop;
pub mod browser;
pub mod errors;
pub mod llm_provider;
pub mod tools;
pub mod trace;
pub mod usage;

pub use agent_loop::{
    BrowserFindings, BrowserResearchAgent, GeneralAgent, GeneralOutcome, LoopConfig, RunOutcome,
    Task,
};
pub use browser::{BrowserCapability, BrowserProvider, ExtractedText, PageLocation, StaticBrowser};
pub use errors::AgentError;
pub use llm_provider::{
    ChatMessage, GenerateRequest, GenerateResponse, LlmProvider, Role, ScriptedLlmProvider,
    ToolCallRequest,
};
pub use tools::{
    browser_toolset, general_toolset, validate, validate_for, validate_named, ToolDescriptor,
    ToolId, ToolInput,
};
pub use trace::{ToolTrace, TraceRecord};
pub use usage::UsageRecord;
