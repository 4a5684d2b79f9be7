use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::SharedState;

/// Response for creating a session
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub host_token: String,
}

/// Response for joining a session
#[derive(Serialize, Deserialize, ToSchema)]
pub struct JoinSessionResponse {
    pub participant_token: String,
    pub session_id: String,
    #[schema(value_type = Object)]
    pub state: SharedState,
}

/// Query string carrying a session token
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TokenQuery {
    pub token: Option<String>,
}

/// Request body for leaving a session
#[derive(Serialize, Deserialize, ToSchema)]
pub struct LeaveSessionRequest {
    pub session_id: String,
    pub token: String,
}
