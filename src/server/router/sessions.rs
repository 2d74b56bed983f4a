use std::time::Duration;

use async_stream::stream;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Sse};
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::warn;

use crate::server::ServeState;
use crate::sessions::{CreateSessionRequest, SessionEvent, TaskSession};

pub(crate) fn router() -> axum::Router<ServeState> {
    axum::Router::new()
        .route(
            "/sessions",
            get(list_sessions_handler).post(create_session_handler),
        )
        .route("/sessions/:session_id", get(session_detail_handler))
        .route("/sessions/:session_id/stop", post(stop_session_handler))
        .route("/sessions/:session_id/events", get(session_events_handler))
}

#[derive(Serialize)]
struct SessionListResponse {
    sessions: Vec<TaskSession>,
}

async fn list_sessions_handler(State(state): State<ServeState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.sessions().list(),
    })
}

async fn create_session_handler(
    State(state): State<ServeState>,
    Json(payload): Json<CreateSessionRequest>,
) -> impl IntoResponse {
    let session = state.sessions().create_session(payload);
    (StatusCode::CREATED, Json(session))
}

async fn session_detail_handler(
    State(state): State<ServeState>,
    Path(session_id): Path<String>,
) -> Result<Json<TaskSession>, (StatusCode, Json<serde_json::Value>)> {
    state
        .sessions()
        .get(&session_id)
        .map(Json)
        .ok_or_else(|| not_found("session not found"))
}

async fn stop_session_handler(
    State(state): State<ServeState>,
    Path(session_id): Path<String>,
) -> Result<Json<TaskSession>, (StatusCode, Json<serde_json::Value>)> {
    state
        .sessions()
        .stop(&session_id)
        .await
        .map(Json)
        .ok_or_else(|| not_found("session not found"))
}

async fn session_events_handler(
    State(state): State<ServeState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    // Subscription happens before the snapshot is read so no transition can
    // fall between the two. A late subscriber gets the current state first,
    // then live events only.
    let Some((session, mut receiver)) = state.sessions().watch(&session_id) else {
        return Err(not_found("session not found"));
    };
    let initial = SessionEvent::Snapshot { session };
    let stream = stream! {
        let mut next_id: u64 = 0;
        if let Some(event) = serialize_event(&initial, &mut next_id) {
            yield Ok::<Event, std::convert::Infallible>(event);
        }
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(serialized) = serialize_event(&event, &mut next_id) {
                        yield Ok(serialized);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(err) => {
                    warn!(?err, "session event stream closed");
                    break;
                }
            }
        }
    };
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn serialize_event(event: &SessionEvent, next_id: &mut u64) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(payload) => {
            let id = *next_id;
            *next_id += 1;
            Some(
                Event::default()
                    .id(id.to_string())
                    .event(event.name())
                    .data(payload),
            )
        }
        Err(err) => {
            warn!(?err, "failed to serialize session event");
            None
        }
    }
}

fn not_found(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": message })),
    )
}
