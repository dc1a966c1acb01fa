use axum::{
    Json, Router,
    extract::{Extension, State},
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::db::models::{ActivityLevel, InstanceRecord, LifecyclePhase};
use crate::instance_api::ConfigUpdate;
use crate::lifecycle;
use crate::web::models::{
    AuthenticatedUser, DeployRequest, DeployResponse, SkillUpdateRequest, SkillsResponse,
    StatusResponse,
};
use crate::web::{AppError, AppState};

pub fn agent_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/deploy", post(deploy_agent))
        .route("/stop", post(stop_agent))
        .route("/skills", get(get_skills).post(update_skills))
        .route("/config", post(push_config))
        .route("/logs", get(get_logs))
}

async fn get_status(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AppError> {
    let record = app_state.instances.get_by_user(&auth_user.id).await?;

    let response = match record {
        Some(record) => StatusResponse {
            status: lifecycle::derived_status(&record),
            is_deployed: record.is_deployed,
            domain: record.domain.clone(),
            llm_provider: Some(record.llm_provider),
            system_prompt: record.system_prompt.clone(),
            configured_at: record.configured_at,
            health: record.health.clone(),
            skills: Some(record.skills),
        },
        None => StatusResponse {
            status: crate::db::models::ExternalStatus::NotDeployed,
            is_deployed: false,
            domain: None,
            llm_provider: None,
            system_prompt: None,
            configured_at: None,
            health: None,
            skills: None,
        },
    };
    Ok(Json(response))
}

async fn deploy_agent(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<DeployRequest>,
) -> Result<Json<DeployResponse>, AppError> {
    let telegram_token = payload.telegram_token.filter(|t| !t.is_empty());
    let discord_token = payload.discord_token.filter(|t| !t.is_empty());
    let whatsapp_token = payload.whatsapp_token.filter(|t| !t.is_empty());

    if telegram_token.is_none() && discord_token.is_none() && whatsapp_token.is_none() {
        return Err(AppError::InvalidInput(
            "At least one channel token is required".to_string(),
        ));
    }
    if payload.llm_api_key.is_empty() {
        return Err(AppError::InvalidInput(
            "An LLM API key is required".to_string(),
        ));
    }

    let mut record = app_state
        .instances
        .get_by_user(&auth_user.id)
        .await?
        .unwrap_or_else(|| {
            InstanceRecord::new(
                auth_user.id.clone(),
                payload.llm_provider,
                payload.llm_api_key.clone(),
            )
        });

    record.telegram_token = telegram_token;
    record.discord_token = discord_token;
    record.whatsapp_token = whatsapp_token;
    record.llm_provider = payload.llm_provider;
    record.llm_api_key = payload.llm_api_key;
    if payload.system_prompt.is_some() {
        record.system_prompt = payload.system_prompt;
    }

    // Credentials are persisted up front; the deployment-handle fields are
    // only written after the whole provisioning sequence succeeded.
    app_state.instances.upsert(record.clone()).await?;

    match app_state.orchestrator.deploy(&record).await {
        Ok(handle) => {
            lifecycle::apply_deploy(&mut record, &handle);
            app_state.instances.upsert(record).await?;
            app_state
                .instances
                .append_activity(
                    &auth_user.id,
                    ActivityLevel::Info,
                    format!("Instance provisioning started (service {})", handle.service_id),
                )
                .await?;
            Ok(Json(DeployResponse {
                message: "Deployment triggered successfully".to_string(),
                service_id: handle.service_id,
                domain: handle.domain,
                setup_password: handle.setup_password,
            }))
        }
        Err(e) => {
            error!(user_id = %auth_user.id, error = %e, "Failed to deploy instance");
            app_state
                .instances
                .append_activity(
                    &auth_user.id,
                    ActivityLevel::Error,
                    format!("Failed to deploy instance: {e}"),
                )
                .await?;
            Err(e.into())
        }
    }
}

async fn stop_agent(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let mut record = app_state
        .instances
        .get_by_user(&auth_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Agent is not deployed".to_string()))?;

    // An absent service id is a caller error; no remote call is made.
    let service_id = record
        .service_id
        .clone()
        .ok_or_else(|| AppError::NotFound("Agent is not deployed".to_string()))?;

    match app_state.orchestrator.stop(&service_id).await {
        Ok(()) => {
            lifecycle::apply_stop(&mut record);
            app_state.instances.upsert(record).await?;
            app_state
                .instances
                .append_activity(
                    &auth_user.id,
                    ActivityLevel::Info,
                    format!("Instance stopped (service {service_id})"),
                )
                .await?;
            Ok(Json(
                serde_json::json!({ "message": "Agent stopped successfully" }),
            ))
        }
        Err(e) => {
            // Handle retained so the operator can retry the teardown.
            error!(user_id = %auth_user.id, service_id = %service_id, error = %e,
                "Failed to stop instance");
            app_state
                .instances
                .append_activity(
                    &auth_user.id,
                    ActivityLevel::Error,
                    format!("Failed to stop instance: {e}"),
                )
                .await?;
            Err(e.into())
        }
    }
}

async fn get_skills(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SkillsResponse>, AppError> {
    let record = app_state.instances.get_by_user(&auth_user.id).await?;
    Ok(Json(SkillsResponse {
        skills: record.map(|r| r.skills).unwrap_or_default(),
    }))
}

/// Applies a skill edit locally and, when the instance is deployed, pushes it
/// over the administrative channel. Skills may be edited before first
/// deployment, so a missing or unreachable instance does not fail the local
/// edit.
async fn update_skills(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SkillUpdateRequest>,
) -> Result<Json<SkillsResponse>, AppError> {
    let mut record = app_state
        .instances
        .get_by_user(&auth_user.id)
        .await?
        .unwrap_or_else(|| {
            InstanceRecord::new(
                auth_user.id.clone(),
                crate::db::models::LlmProvider::OpenAi,
                String::new(),
            )
        });

    record.skills.apply(&payload.skills);
    app_state.instances.upsert(record.clone()).await?;
    app_state
        .instances
        .append_activity(&auth_user.id, ActivityLevel::Info, "Skills updated".to_string())
        .await?;

    if record.is_deployed {
        if let (Some(domain), Some(password)) = (&record.domain, &record.setup_password) {
            if let Err(e) = app_state
                .instance_api
                .push_skills(domain, password, &payload.skills)
                .await
            {
                warn!(user_id = %auth_user.id, error = %e,
                    "Skill push to running instance failed; local edit kept");
                app_state
                    .instances
                    .append_activity(
                        &auth_user.id,
                        ActivityLevel::Warn,
                        format!("Skill push to running instance failed: {e}"),
                    )
                    .await?;
            }
        }
    }

    Ok(Json(SkillsResponse {
        skills: record.skills,
    }))
}

/// Forwards a partial configuration update to the running instance, then
/// reconciles the local record with the fields that were pushed. The local
/// record is only touched after the instance accepted the change.
async fn push_config(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut record = app_state
        .instances
        .get_by_user(&auth_user.id)
        .await?
        .ok_or(AppError::NoActiveInstance)?;

    let (domain, password) = match (record.domain.clone(), record.setup_password.clone()) {
        (Some(domain), Some(password)) if record.phase != LifecyclePhase::Offline => {
            (domain, password)
        }
        _ => return Err(AppError::NoActiveInstance),
    };

    let response = app_state
        .instance_api
        .push_config(&domain, &password, &update)
        .await?;

    if let Some(token) = update.telegram_token {
        record.telegram_token = Some(token);
    }
    if let Some(token) = update.discord_token {
        record.discord_token = Some(token);
    }
    if let Some(token) = update.whatsapp_token {
        record.whatsapp_token = Some(token);
    }
    if let Some(provider) = update.llm_provider {
        record.llm_provider = provider;
    }
    if let Some(key) = update.llm_api_key {
        record.llm_api_key = key;
    }
    if let Some(prompt) = update.system_prompt {
        record.system_prompt = Some(prompt);
    }
    if let Some(skills) = &update.skills {
        record.skills.apply(skills);
    }
    app_state.instances.upsert(record).await?;
    app_state
        .instances
        .append_activity(
            &auth_user.id,
            ActivityLevel::Info,
            "Configuration pushed to instance".to_string(),
        )
        .await?;

    Ok(Json(response))
}

async fn get_logs(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let logs = app_state
        .instances
        .activity_for_user(&auth_user.id, 100)
        .await?;
    Ok(Json(serde_json::json!({ "logs": logs })))
}
