use axum::{Json, Router, extract::State, routing::post};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::models::{ActivityLevel, HealthSnapshot};
use crate::lifecycle::{self, ReportedStatus};
use crate::web::models::{HealthCallbackPayload, StatusCallbackPayload};
use crate::web::{AppError, AppState};

/// Inbound events from deployed instances. Callers are identified solely by
/// the service id their instance was provisioned under; no per-instance
/// secret is validated. Anyone who learns a live service id can post here —
/// a known trust gap, since the fix requires the instance side to send its
/// gateway token on every callback.
pub fn callback_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", post(status_callback))
        .route("/health", post(health_callback))
}

async fn status_callback(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<StatusCallbackPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let instance_id = payload
        .instance_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput("instanceId is required".to_string()))?;

    let mut record = app_state
        .instances
        .get_by_service_id(&instance_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown instance {instance_id}")))?;

    info!(instance_id = %instance_id, status = ?payload.status, "Received status callback");

    lifecycle::apply_status_event(&mut record, payload.status, payload.timestamp);
    let user_id = record.user_id.clone();
    app_state.instances.upsert(record).await?;

    let (level, message) = match payload.status {
        ReportedStatus::Configured => (
            ActivityLevel::Info,
            "Instance reported status: configured".to_string(),
        ),
        ReportedStatus::Running => (
            ActivityLevel::Info,
            "Instance reported status: running".to_string(),
        ),
        ReportedStatus::Error => {
            let detail = payload.error.as_deref().unwrap_or("unknown error");
            warn!(instance_id = %instance_id, error = %detail, "Instance reported an error");
            (
                ActivityLevel::Error,
                format!("Instance reported an error: {detail}"),
            )
        }
    };
    app_state
        .instances
        .append_activity(&user_id, level, message)
        .await?;

    Ok(Json(serde_json::json!({ "received": true })))
}

async fn health_callback(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<HealthCallbackPayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    let instance_id = payload
        .instance_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidInput("instanceId is required".to_string()))?;

    let mut record = app_state
        .instances
        .get_by_service_id(&instance_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown instance {instance_id}")))?;

    // Last write wins: the snapshot is replaced wholesale, with no ordering
    // guarantee against out-of-order delivery.
    record.health = Some(HealthSnapshot {
        uptime_ms: payload.uptime_ms,
        configured: payload.configured,
        gateway_running: payload.gateway_running,
        gateway_reachable: payload.gateway_reachable,
        last_error: payload.last_error,
        reported_at: payload.timestamp.unwrap_or_else(Utc::now),
    });
    app_state.instances.upsert(record).await?;

    Ok(Json(serde_json::json!({ "received": true })))
}
