//! Server-side session tracking: concurrent agent runs, each independently
//! observable through a per-session event stream.

mod live;
mod service;
mod types;

pub use live::SessionEvent;
pub use service::{SessionService, SessionServiceConfig};
pub use types::{
    ChatRole, CreateSessionRequest, SessionAction, SessionMessage, SessionStatus, TaskSession,
};
