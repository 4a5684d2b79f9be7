use axum::{extract::State, Json};
use crate::{models::HealthResponse, AppState};
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        active_sessions: None,
    })
}

/// Readiness check endpoint, also confirms the session store answers
pub async fn ready_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let stats = state.store.stats().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
        active_sessions: Some(stats.sessions as u32),
    })
}
