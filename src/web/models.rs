use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{
    ExternalStatus, HealthSnapshot, LlmProvider, SkillSet, SkillUpdate,
};
use crate::lifecycle::ReportedStatus;

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
}

// JWT Claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (username)
    pub user_id: String,
    pub exp: usize, // Expiration time (timestamp)
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub telegram_token: Option<String>,
    pub discord_token: Option<String>,
    pub whatsapp_token: Option<String>,
    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    pub message: String,
    pub service_id: String,
    pub domain: String,
    pub setup_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: ExternalStatus,
    pub is_deployed: bool,
    pub domain: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub system_prompt: Option<String>,
    pub configured_at: Option<DateTime<Utc>>,
    pub health: Option<HealthSnapshot>,
    pub skills: Option<SkillSet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillUpdateRequest {
    pub skills: SkillUpdate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillsResponse {
    pub skills: SkillSet,
}

/// Lifecycle status event emitted by a deployed instance. Identified solely
/// by the service id it was provisioned under.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCallbackPayload {
    pub instance_id: Option<String>,
    pub status: ReportedStatus,
    pub timestamp: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Periodic health report emitted by a deployed instance.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCallbackPayload {
    pub instance_id: Option<String>,
    #[serde(default)]
    pub uptime_ms: i64,
    #[serde(default)]
    pub configured: bool,
    #[serde(default)]
    pub gateway_running: bool,
    #[serde(default)]
    pub gateway_reachable: bool,
    pub last_error: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}
