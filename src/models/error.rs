use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Close code sent when the session does not exist or has expired.
pub const CLOSE_NOT_FOUND: u16 = 4004;
/// Close code sent when the token is not recognized for the session.
pub const CLOSE_UNAUTHORIZED: u16 = 4401;
const CLOSE_POLICY_VIOLATION: u16 = 1008;
const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Failures surfaced to HTTP callers and connecting clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,
    #[error("Unauthorized token")]
    Unauthorized,
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SessionError::NotFound => StatusCode::NOT_FOUND,
            SessionError::Unauthorized => StatusCode::UNAUTHORIZED,
            SessionError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            SessionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// WebSocket close code for a refused connection.
    pub fn close_code(&self) -> u16 {
        match self {
            SessionError::NotFound => CLOSE_NOT_FOUND,
            SessionError::Unauthorized => CLOSE_UNAUTHORIZED,
            SessionError::InvalidBody(_) => CLOSE_POLICY_VIOLATION,
            SessionError::Internal(_) => CLOSE_INTERNAL_ERROR,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status();
        (
            status,
            Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
