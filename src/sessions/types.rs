use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use webscout_core_types::ActionId;

/// Lifecycle of a session. Transitions run pending → running → one terminal
/// state; terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in a session's append-only message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl SessionMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// One browser action observed during a session run. Appended when the
/// action starts; only its completion timestamp and error are attached later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionAction {
    pub id: ActionId,
    pub kind: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SessionAction {
    pub fn started(kind: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            id: ActionId::new(),
            kind: kind.into(),
            detail,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
        }
    }
}

/// The server-owned record of one goal-driven run. Mutated only by the
/// session-processing task; read by HTTP and event consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSession {
    pub id: String,
    pub goal: String,
    pub language: String,
    pub status: SessionStatus,
    pub messages: Vec<SessionMessage>,
    pub actions: Vec<SessionAction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub goal: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub max_characters: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_terminal() {
        assert!(!SessionStatus::Pending.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
    }
}
