use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, info};

use crate::models::{
    CreateSessionResponse, JoinSessionResponse, LeaveSessionRequest, SessionError, SharedState,
    TokenQuery,
};
use crate::AppState;

/// Create a session from an optional initial shared-state document
pub async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreateSessionResponse>), SessionError> {
    let initial = if body.iter().all(u8::is_ascii_whitespace) {
        SharedState::default()
    } else {
        serde_json::from_slice::<SharedState>(&body)
            .map_err(|e| SessionError::InvalidBody(e.to_string()))?
    };

    let (session_id, host_token) = state.store.create(initial).await;
    Ok((
        StatusCode::OK,
        Json(CreateSessionResponse {
            session_id,
            host_token,
        }),
    ))
}

/// Join an existing session and receive a participant token
pub async fn join_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<JoinSessionResponse>, SessionError> {
    let (participant_token, shared) = state.store.join(&session_id).await?;
    Ok(Json(JoinSessionResponse {
        participant_token,
        session_id,
        state: shared,
    }))
}

/// Leave a session, token passed as a query parameter
pub async fn leave_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<StatusCode, SessionError> {
    let token = query.token.unwrap_or_default();
    state.store.leave(&session_id, &token).await?;
    debug!(session_id = %session_id, "leave handled");
    Ok(StatusCode::OK)
}

/// Leave a session, ids passed in the JSON body
pub async fn leave_session_body(
    State(state): State<AppState>,
    Json(request): Json<LeaveSessionRequest>,
) -> Result<StatusCode, SessionError> {
    state.store.leave(&request.session_id, &request.token).await?;
    info!(session_id = %request.session_id, "leave handled");
    Ok(StatusCode::OK)
}
