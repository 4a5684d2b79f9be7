use crate::{
    handlers::{
        create_session, diagnostics, health_check, join_session, leave_session,
        leave_session_body, ready_check,
    },
    ws::gateway::websocket_handler,
    AppState,
};
use axum::{
    routing::{get, post},
    Router,
};

/// Session lifecycle and streaming routes
pub fn create_session_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/sessions", post(create_session))
        .route("/sessions/leave", post(leave_session_body))
        .route("/sessions/:session_id/join", post(join_session))
        .route("/sessions/:session_id/leave", post(leave_session))
        .route("/ws/:session_id", get(websocket_handler))
}

/// Operational routes
pub fn create_api_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/api/v1/diagnostics", get(diagnostics))
}
