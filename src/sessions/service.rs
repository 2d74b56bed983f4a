//! Session registry: owns every live session, runs each one on its own
//! spawned task, and fans lifecycle events out per session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use agent_core::{
    AgentError, BrowserCapability, BrowserProvider, BrowserResearchAgent, ExtractedText,
    LlmProvider, LoopConfig, PageLocation, Task,
};
use webscout_core_types::{ActionId, SessionId};
use webscout_event_bus::{EventBus, InMemoryBus};

use super::live::SessionEvent;
use super::types::{
    CreateSessionRequest, SessionAction, SessionMessage, SessionStatus, TaskSession,
};

const SESSION_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct SessionServiceConfig {
    pub loop_config: LoopConfig,
}

impl Default for SessionServiceConfig {
    fn default() -> Self {
        Self {
            loop_config: LoopConfig::browser(),
        }
    }
}

/// Constructed once per process and handed explicitly to the transport
/// layer; there is no ambient singleton. Sessions are never evicted while
/// the process lives.
pub struct SessionService {
    llm: Arc<dyn LlmProvider>,
    browsers: Arc<dyn BrowserProvider>,
    config: SessionServiceConfig,
    handles: DashMap<String, Arc<SessionHandle>>,
}

impl SessionService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        browsers: Arc<dyn BrowserProvider>,
        config: SessionServiceConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            llm,
            browsers,
            config,
            handles: DashMap::new(),
        })
    }

    /// Register a session and kick off its run. Returns as soon as the
    /// record is stored; the agent loop starts on its own task.
    pub fn create_session(self: &Arc<Self>, request: CreateSessionRequest) -> TaskSession {
        let now = Utc::now();
        let session = TaskSession {
            id: SessionId::new().to_string(),
            goal: request.goal.clone(),
            language: request.language.clone().unwrap_or_else(|| "en".to_string()),
            status: SessionStatus::Pending,
            messages: vec![SessionMessage::user(request.goal.clone())],
            actions: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let handle = Arc::new(SessionHandle::new(session.clone()));
        self.handles.insert(session.id.clone(), handle.clone());
        info!(session_id = %session.id, goal = %session.goal, "session created");

        let service = Arc::clone(self);
        tokio::spawn(async move {
            handle
                .emit(SessionEvent::SessionCreated {
                    session: handle.session(),
                })
                .await;
            service.run_session(handle, request).await;
        });

        session
    }

    pub fn list(&self) -> Vec<TaskSession> {
        let mut sessions: Vec<TaskSession> = self
            .handles
            .iter()
            .map(|entry| entry.value().session())
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sessions
    }

    pub fn get(&self, session_id: &str) -> Option<TaskSession> {
        self.handles
            .get(session_id)
            .map(|entry| entry.value().session())
    }

    pub fn subscribe(&self, session_id: &str) -> Option<broadcast::Receiver<SessionEvent>> {
        self.handles
            .get(session_id)
            .map(|entry| entry.value().subscribe())
    }

    /// Subscribe and snapshot in one step, subscription first. A transition
    /// landing between the two calls is then guaranteed to arrive on the
    /// receiver instead of falling between snapshot and stream.
    pub fn watch(&self, session_id: &str) -> Option<(TaskSession, broadcast::Receiver<SessionEvent>)> {
        let handle = self.handles.get(session_id)?.value().clone();
        let receiver = handle.subscribe();
        Some((handle.session(), receiver))
    }

    /// Flip a non-terminal session to `cancelled`. The underlying loop is
    /// not interrupted; it runs to its bounded end, and the terminal-state
    /// guard discards its final status update.
    pub async fn stop(&self, session_id: &str) -> Option<TaskSession> {
        let handle = self.handles.get(session_id)?.value().clone();
        if handle.set_status(SessionStatus::Cancelled).await {
            handle
                .append_message(SessionMessage::assistant("Session stopped by request."))
                .await;
        }
        Some(handle.session())
    }

    async fn run_session(self: Arc<Self>, handle: Arc<SessionHandle>, request: CreateSessionRequest) {
        handle.set_status(SessionStatus::Running).await;

        let result = self.drive_run(&handle, &request).await;
        match result {
            Ok(summary) => {
                handle.append_message(SessionMessage::assistant(summary)).await;
                handle.set_status(SessionStatus::Completed).await;
                info!(session_id = %handle.id(), "session completed");
            }
            Err(err) => {
                error!(session_id = %handle.id(), %err, "session failed");
                handle
                    .append_message(SessionMessage::assistant(format!("Run failed: {err}")))
                    .await;
                handle.set_status(SessionStatus::Failed).await;
            }
        }
    }

    async fn drive_run(
        &self,
        handle: &Arc<SessionHandle>,
        request: &CreateSessionRequest,
    ) -> Result<String, AgentError> {
        let browser = self.browsers.open().await?;
        let observed = Arc::new(ObservedBrowser {
            inner: browser,
            handle: handle.clone(),
        });

        let mut task = Task {
            goal: request.goal.clone(),
            url: request.url.clone(),
            selector: request.selector.clone(),
            max_characters: request.max_characters,
            context: None,
        };
        if task.goal.trim().is_empty() {
            task.goal = "Summarise the target page.".to_string();
        }

        let agent = BrowserResearchAgent::new(self.llm.clone(), observed)
            .with_config(self.config.loop_config);
        let outcome = agent.run(&task).await?;
        Ok(outcome.summary)
    }
}

struct SessionHandle {
    record: RwLock<TaskSession>,
    bus: Arc<InMemoryBus<SessionEvent>>,
}

impl SessionHandle {
    fn new(session: TaskSession) -> Self {
        Self {
            record: RwLock::new(session),
            bus: InMemoryBus::new(SESSION_EVENT_CAPACITY),
        }
    }

    fn id(&self) -> String {
        self.record.read().id.clone()
    }

    fn session(&self) -> TaskSession {
        self.record.read().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    async fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.bus.publish(event).await {
            warn!(%err, "failed to publish session event");
        }
    }

    /// Apply a status transition unless the session is already terminal.
    /// Returns whether the transition took effect.
    async fn set_status(&self, status: SessionStatus) -> bool {
        let updated = {
            let mut record = self.record.write();
            if record.status.is_terminal() {
                return false;
            }
            record.status = status;
            record.updated_at = Utc::now();
            record.clone()
        };
        self.emit(SessionEvent::SessionUpdated { session: updated })
            .await;
        true
    }

    async fn append_message(&self, message: SessionMessage) {
        let (session_id, message) = {
            let mut record = self.record.write();
            record.messages.push(message.clone());
            record.updated_at = Utc::now();
            (record.id.clone(), message)
        };
        self.emit(SessionEvent::Message {
            session_id,
            message,
        })
        .await;
    }

    async fn action_started(&self, action: SessionAction) {
        let session_id = {
            let mut record = self.record.write();
            record.actions.push(action.clone());
            record.updated_at = Utc::now();
            record.id.clone()
        };
        self.emit(SessionEvent::ActionStarted { session_id, action })
            .await;
    }

    async fn action_finished(&self, action_id: &ActionId, error: Option<String>) {
        let emitted = {
            let mut record = self.record.write();
            let session_id = record.id.clone();
            record.updated_at = Utc::now();
            record
                .actions
                .iter_mut()
                .find(|action| &action.id == action_id)
                .map(|action| {
                    action.finished_at = Some(Utc::now());
                    action.error = error;
                    (session_id, action.clone())
                })
        };
        if let Some((session_id, action)) = emitted {
            self.emit(SessionEvent::ActionFinished { session_id, action })
                .await;
        }
    }
}

/// Wraps the per-run browser so each navigate/extract/snapshot call emits
/// `action-started`/`action-finished` on the session stream as it happens.
struct ObservedBrowser {
    inner: Arc<dyn BrowserCapability>,
    handle: Arc<SessionHandle>,
}

impl ObservedBrowser {
    async fn finish<T>(
        &self,
        action_id: &ActionId,
        result: Result<T, AgentError>,
    ) -> Result<T, AgentError> {
        let error = result.as_ref().err().map(|err| err.to_string());
        self.handle.action_finished(action_id, error).await;
        result
    }
}

#[async_trait]
impl BrowserCapability for ObservedBrowser {
    async fn navigate(&self, url: &str) -> Result<PageLocation, AgentError> {
        let action = SessionAction::started("navigate", Some(url.to_string()));
        let action_id = action.id.clone();
        self.handle.action_started(action).await;
        let result = self.inner.navigate(url).await;
        self.finish(&action_id, result).await
    }

    async fn extract_text(
        &self,
        selector: Option<&str>,
        max_characters: Option<u32>,
    ) -> Result<ExtractedText, AgentError> {
        let action = SessionAction::started("extract_text", selector.map(str::to_string));
        let action_id = action.id.clone();
        self.handle.action_started(action).await;
        let result = self.inner.extract_text(selector, max_characters).await;
        self.finish(&action_id, result).await
    }

    async fn dom_snapshot(&self) -> Result<String, AgentError> {
        let action = SessionAction::started("dom_snapshot", None);
        let action_id = action.id.clone();
        self.handle.action_started(action).await;
        let result = self.inner.dom_snapshot().await;
        self.finish(&action_id, result).await
    }

    async fn close(&self) -> Result<(), AgentError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{GenerateResponse, ScriptedLlmProvider, StaticBrowser};
    use serde_json::json;

    use crate::sessions::ChatRole;

    struct StaticProvider;

    #[async_trait]
    impl BrowserProvider for StaticProvider {
        async fn open(&self) -> Result<Arc<dyn BrowserCapability>, AgentError> {
            Ok(Arc::new(StaticBrowser::new().with_page(
                "https://example.com",
                "Example Domain",
                "Example body text for research.",
            )))
        }
    }

    fn service(script: Vec<GenerateResponse>) -> Arc<SessionService> {
        SessionService::new(
            Arc::new(ScriptedLlmProvider::new(script)),
            Arc::new(StaticProvider),
            SessionServiceConfig::default(),
        )
    }

    fn request() -> CreateSessionRequest {
        CreateSessionRequest {
            goal: "Summarise the homepage".to_string(),
            url: Some("https://example.com".to_string()),
            selector: None,
            max_characters: None,
            language: None,
        }
    }

    fn done_script() -> Vec<GenerateResponse> {
        vec![
            GenerateResponse::tool("navigate", json!({"url": "https://example.com"})),
            GenerateResponse::text("DONE: homepage summarised."),
        ]
    }

    async fn wait_terminal(service: &Arc<SessionService>, id: &str) -> TaskSession {
        for _ in 0..200 {
            let session = service.get(id).expect("session exists");
            if session.status.is_terminal() {
                return session;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("session never reached a terminal state");
    }

    #[tokio::test]
    async fn create_returns_before_the_run_finishes() {
        let service = service(done_script());
        let created = service.create_session(request());
        assert_eq!(created.status, SessionStatus::Pending);
        assert_eq!(created.messages.len(), 1);

        let finished = wait_terminal(&service, &created.id).await;
        assert_eq!(finished.status, SessionStatus::Completed);
        assert!(finished
            .messages
            .iter()
            .any(|m| m.role == ChatRole::Assistant && m.content.contains("DONE:")));
        assert_eq!(finished.actions.len(), 1);
        assert_eq!(finished.actions[0].kind, "navigate");
        assert!(finished.actions[0].finished_at.is_some());
        assert!(finished.actions[0].error.is_none());
    }

    #[tokio::test]
    async fn failed_run_marks_session_failed_with_a_message() {
        let script = vec![GenerateResponse::tool(
            "navigate",
            json!({"url": "https://nowhere.invalid"}),
        )];
        let service = service(script);
        let created = service.create_session(request());
        let finished = wait_terminal(&service, &created.id).await;
        assert_eq!(finished.status, SessionStatus::Failed);
        assert!(finished
            .messages
            .iter()
            .any(|m| m.content.contains("Run failed")));
        // The failing action still got its finish record.
        assert!(finished.actions[0].error.is_some());
    }

    #[tokio::test]
    async fn status_never_leaves_a_terminal_state() {
        let service = service(done_script());
        let created = service.create_session(request());
        let finished = wait_terminal(&service, &created.id).await;
        assert_eq!(finished.status, SessionStatus::Completed);

        // Stop after completion is a no-op on status.
        let after_stop = service.stop(&created.id).await.expect("session exists");
        assert_eq!(after_stop.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn subscriber_sees_lifecycle_events_in_order() {
        let service = service(done_script());
        let created = service.create_session(request());
        let mut rx = service.subscribe(&created.id).expect("subscribe");

        let mut names = Vec::new();
        while let Ok(event) = rx.recv().await {
            names.push(event.name());
            if matches!(
                &event,
                SessionEvent::SessionUpdated { session } if session.status.is_terminal()
            ) {
                break;
            }
        }
        assert_eq!(names.first(), Some(&"session-created"));
        let started = names.iter().position(|n| *n == "action-started").unwrap();
        let finished = names.iter().position(|n| *n == "action-finished").unwrap();
        assert!(started < finished);
        assert!(names.contains(&"message"));
    }

    #[tokio::test]
    async fn unknown_session_lookups_return_none() {
        let service = service(Vec::new());
        assert!(service.get("missing").is_none());
        assert!(service.subscribe("missing").is_none());
        assert!(service.stop("missing").await.is_none());
    }
}
