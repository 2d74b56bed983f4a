use std::sync::Arc;

use crate::sessions::SessionService;

#[derive(Clone)]
pub struct ServeState {
    sessions: Arc<SessionService>,
}

impl ServeState {
    pub fn new(sessions: Arc<SessionService>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionService> {
        &self.sessions
    }
}
