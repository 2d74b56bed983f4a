mod router;
mod state;

pub use router::build_router;
pub use state::ServeState;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::sessions::SessionService;

/// Binds the HTTP surface and serves until the process is stopped.
pub async fn serve(sessions: Arc<SessionService>, port: u16) -> anyhow::Result<()> {
    let state = ServeState::new(sessions);
    let app = build_router().with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "serving HTTP API");
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")
}
