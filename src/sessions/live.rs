use serde::{Deserialize, Serialize};

use super::types::{SessionAction, SessionMessage, TaskSession};

/// Tagged union of everything a session stream can carry.
///
/// Events are observational: they mirror state changes in the order they
/// happen and are never replayed from storage. `Snapshot` is synthetic,
/// emitted once to each late subscriber before its live events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    SessionCreated {
        session: TaskSession,
    },
    SessionUpdated {
        session: TaskSession,
    },
    ActionStarted {
        session_id: String,
        action: SessionAction,
    },
    ActionFinished {
        session_id: String,
        action: SessionAction,
    },
    Message {
        session_id: String,
        message: SessionMessage,
    },
    Snapshot {
        session: TaskSession,
    },
}

impl SessionEvent {
    /// Event name used on the wire (SSE `event:` field).
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session-created",
            Self::SessionUpdated { .. } => "session-updated",
            Self::ActionStarted { .. } => "action-started",
            Self::ActionFinished { .. } => "action-finished",
            Self::Message { .. } => "message",
            Self::Snapshot { .. } => "snapshot",
        }
    }
}
