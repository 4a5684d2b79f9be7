use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Create a collaborative session
///
/// The body is an optional initial shared-state document
/// (`tests`, `activeTestId`, `viewMode`).
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 200, description = "Session created", body = CreateSessionResponse),
        (status = 400, description = "Body is not a shared-state document", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn create_session_doc() {}

/// Join a session and receive a participant token
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/join",
    params(
        ("session_id" = String, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Joined", body = JoinSessionResponse),
        (status = 404, description = "Session not found or expired", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn join_session_doc() {}

/// Leave a session
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/leave",
    params(
        ("session_id" = String, Path, description = "Session id"),
        TokenQuery
    ),
    responses(
        (status = 200, description = "Left (idempotent)"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn leave_session_doc() {}

/// Leave a session, ids in the body
#[utoipa::path(
    post,
    path = "/sessions/leave",
    request_body = LeaveSessionRequest,
    responses(
        (status = 200, description = "Left (idempotent)"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn leave_session_body_doc() {}

/// Session and process diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        create_session_doc,
        join_session_doc,
        leave_session_doc,
        leave_session_body_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            CreateSessionResponse,
            JoinSessionResponse,
            LeaveSessionRequest,
            DiagnosticsResponse
        )
    ),
    tags(
        (name = "sessions", description = "Collaborative session endpoints")
    )
)]
pub struct ApiDoc;
