use thiserror::Error;
use webscout_sandbox::SandboxError;

/// Errors emitted by the agent-core crate.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A tool input failed validation. Names the offending field and the
    /// violated constraint so the model can correct and retry.
    #[error("invalid tool input: {field}: {constraint}")]
    Validation { field: String, constraint: String },

    /// The model requested a tool name that is not in the registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A capability was used out of order (e.g. extraction before navigation).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A tool executor failed after validation passed.
    #[error("tool execution failed: {0}")]
    Execution(String),

    /// An operation exceeded its configured bound.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The model provider failed to produce a response.
    #[error("model provider error: {0}")]
    Llm(String),

    /// A sandboxed filesystem or process operation was rejected or failed.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

impl AgentError {
    pub fn validation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Whether the error describes bad input the model may correct on a later
    /// turn. Recoverable errors are fed back into the conversation instead of
    /// failing the run; sandbox rejections count because they are input
    /// problems (bad path, disallowed command), not execution failures.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation { .. } | Self::UnknownTool(_) => true,
            Self::Sandbox(err) => matches!(
                err,
                SandboxError::PathEscape { .. }
                    | SandboxError::InvalidPath(_)
                    | SandboxError::DisallowedCommand(_)
                    | SandboxError::HighRiskRejected { .. }
            ),
            _ => false,
        }
    }
}
