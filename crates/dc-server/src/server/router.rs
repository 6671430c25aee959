//! Routes

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::info;

use super::middleware::{log_request, server_header};
use crate::bridge;
use crate::state::AppState;

/// Path of the terminal WebSocket endpoint
pub const WS_PATH: &str = "/ws";

/// Build the application router
///
/// Only `GET /ws` is served; other methods on it get 405, other paths 404.
/// Every response carries the `Server` header.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(WS_PATH, get(ws_handler))
        .fallback(not_found)
        .layer(axum::middleware::from_fn(log_request))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            server_header,
        ))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    info!("New client connected: {}", peer);

    let tracker = state.sessions.clone();
    ws.on_upgrade(move |socket| tracker.track_future(bridge::run_session(socket, state, peer)))
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
