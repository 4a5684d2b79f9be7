use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API response for health and readiness checks
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Live sessions in the store, reported by the readiness check only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_sessions: Option<u32>,
}
