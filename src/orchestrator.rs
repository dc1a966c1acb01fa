use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::db::models::{InstanceRecord, SkillSet};
use crate::paas::{PaasClient, PaasError};
use crate::secrets::{GATEWAY_TOKEN_BYTES, SETUP_PASSWORD_BYTES, generate_secret};
use crate::server::config::ServerConfig;

/// Stable external handle for a provisioned instance: everything needed to
/// identify it (service id), reach it (public domain) and administer it
/// (setup password).
#[derive(Debug, Clone)]
pub struct DeploymentHandle {
    pub service_id: String,
    pub domain: String,
    pub setup_password: String,
}

/// Sequences control-plane calls into the provisioning and teardown
/// workflows, and owns the environment-variable contract of a deployed
/// instance. Holds its dependencies explicitly; there is no process-wide
/// provider client.
pub struct Orchestrator {
    paas: Arc<dyn PaasClient>,
    config: Arc<ServerConfig>,
}

impl Orchestrator {
    pub fn new(paas: Arc<dyn PaasClient>, config: Arc<ServerConfig>) -> Self {
        Orchestrator { paas, config }
    }

    /// Runs the full provisioning workflow for one user.
    ///
    /// Steps are strictly sequential: later steps consume identifiers
    /// produced by earlier ones. A failure at any step aborts the remainder
    /// and surfaces the error; already-created provider resources are NOT
    /// rolled back and require manual cleanup (logged for the operator).
    pub async fn deploy(&self, record: &InstanceRecord) -> Result<DeploymentHandle, PaasError> {
        if self.config.railway_project_token.is_empty() || self.config.railway_project_id.is_empty()
        {
            return Err(PaasError::AuthFailure);
        }
        let project_id = &self.config.railway_project_id;

        info!(user_id = %record.user_id, "Starting instance provisioning");

        let environment_id = self.paas.resolve_default_environment(project_id).await?;

        let service_name = service_name_for_user(&record.user_id);
        let service_id = self
            .paas
            .create_service(project_id, &service_name, &self.config.template_repo)
            .await
            .inspect_err(|e| error!(user_id = %record.user_id, error = %e, "Service creation failed"))?;

        self.paas
            .set_service_root_path(&service_id, &environment_id, &self.config.template_root)
            .await
            .inspect_err(|e| {
                error!(service_id = %service_id, error = %e,
                    "Root path update failed; orphaned service requires manual cleanup")
            })?;

        // The volume is the instance's durable state directory. It must exist
        // before the service receives traffic, or a redeploy would erase
        // conversation and workspace state.
        self.paas
            .create_volume(
                project_id,
                &environment_id,
                &service_id,
                &self.config.volume_mount_path,
            )
            .await
            .inspect_err(|e| {
                error!(service_id = %service_id, error = %e,
                    "Volume creation failed; orphaned service requires manual cleanup")
            })?;

        let setup_password = generate_secret(SETUP_PASSWORD_BYTES);
        let gateway_token = generate_secret(GATEWAY_TOKEN_BYTES);

        let callback_url = callback_base_url(&self.config);
        let variables = build_environment(
            record,
            &self.config,
            &service_id,
            &setup_password,
            &gateway_token,
            &callback_url,
        );

        self.paas
            .upsert_environment_variables(project_id, &environment_id, &service_id, variables)
            .await
            .inspect_err(|e| {
                error!(service_id = %service_id, error = %e,
                    "Variable upsert failed; orphaned service and volume require manual cleanup")
            })?;

        let domain = self
            .paas
            .create_public_domain(&environment_id, &service_id)
            .await
            .inspect_err(|e| {
                error!(service_id = %service_id, error = %e,
                    "Domain creation failed; orphaned service and volume require manual cleanup")
            })?;

        info!(user_id = %record.user_id, service_id = %service_id, domain = %domain,
            "Instance provisioned");

        Ok(DeploymentHandle {
            service_id,
            domain,
            setup_password,
        })
    }

    /// Tears down the remote service. The caller clears the record's handle,
    /// health snapshot and configured-at on success.
    pub async fn stop(&self, service_id: &str) -> Result<(), PaasError> {
        if self.config.railway_project_token.is_empty() {
            return Err(PaasError::AuthFailure);
        }
        info!(service_id = %service_id, "Deleting instance service");
        self.paas.delete_service(service_id).await
    }
}

/// Deterministic, collision-tolerant service name for a user.
pub fn service_name_for_user(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(8).collect();
    format!("bot-{prefix}")
}

/// Base URL the deployed instance calls back to. Prefers the explicitly
/// configured backend URL; otherwise derives one from the operator-facing
/// frontend URL by stripping any port suffix and appending the backend's own
/// listen port.
pub fn callback_base_url(config: &ServerConfig) -> String {
    if let Some(url) = &config.backend_url {
        if !url.is_empty() {
            return url.trim_end_matches('/').to_string();
        }
    }

    let frontend = config.frontend_url.trim_end_matches('/');
    let (scheme, rest) = match frontend.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", frontend),
    };
    let host = rest.split(':').next().unwrap_or(rest);
    format!("{scheme}://{host}:{}", config.listen_port)
}

/// The provisioning contract: the exact environment variables a deployed
/// instance boots from. Key names must be reproduced exactly for template
/// compatibility. The LLM key is always exported under `OPENAI_API_KEY`,
/// whichever provider is selected; the runtime template reads it from there.
pub fn build_environment(
    record: &InstanceRecord,
    config: &ServerConfig,
    service_id: &str,
    setup_password: &str,
    gateway_token: &str,
    callback_url: &str,
) -> HashMap<String, String> {
    let mount = config.volume_mount_path.trim_end_matches('/');
    let mut variables = HashMap::from([
        ("CLAWDBOT_STATE_DIR".to_string(), format!("{mount}/state")),
        (
            "CLAWDBOT_WORKSPACE_DIR".to_string(),
            format!("{mount}/workspace"),
        ),
        (
            "CLAWDBOT_GATEWAY_TOKEN".to_string(),
            gateway_token.to_string(),
        ),
        ("SETUP_PASSWORD".to_string(), setup_password.to_string()),
        (
            "LLM_PROVIDER".to_string(),
            record.llm_provider.as_str().to_string(),
        ),
        ("OPENAI_API_KEY".to_string(), record.llm_api_key.clone()),
        (
            "CALLBACK_URL".to_string(),
            format!("{callback_url}/api/callbacks"),
        ),
        ("BACKEND_API_URL".to_string(), callback_url.to_string()),
        ("RAILWAY_SERVICE_ID".to_string(), service_id.to_string()),
    ]);

    if let Some(token) = &record.telegram_token {
        variables.insert("TELEGRAM_TOKEN".to_string(), token.clone());
    }
    if let Some(token) = &record.discord_token {
        variables.insert("DISCORD_TOKEN".to_string(), token.clone());
    }
    if let Some(token) = &record.whatsapp_token {
        variables.insert("WHATSAPP_TOKEN".to_string(), token.clone());
    }

    if let Some(prompt) = &record.system_prompt {
        variables.insert("SYSTEM_PROMPT".to_string(), prompt.clone());
    }

    // Serialized only when some skill differs from the defaults; the
    // template treats a missing SKILLS variable as "all off".
    if record.skills != SkillSet::default() {
        if let Ok(serialized) = serde_json::to_string(&record.skills) {
            variables.insert("SKILLS".to_string(), serialized);
        }
    }

    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::LlmProvider;

    fn test_config() -> ServerConfig {
        ServerConfig {
            jwt_secret: "secret".to_string(),
            listen_port: 3001,
            frontend_url: "http://localhost:3000".to_string(),
            backend_url: None,
            railway_api_url: "http://localhost:9999".to_string(),
            railway_project_token: "token".to_string(),
            railway_project_id: "proj".to_string(),
            template_repo: "vignesh07/clawdbot-railway-template".to_string(),
            template_root: "templates/agent-runtime".to_string(),
            volume_mount_path: "/data".to_string(),
            request_timeout_secs: 30,
        }
    }

    fn test_record() -> InstanceRecord {
        let mut record = InstanceRecord::new(
            "64f1b2c3d4e5f6a7b8c9d0e1".to_string(),
            LlmProvider::OpenAi,
            "sk-abc".to_string(),
        );
        record.telegram_token = Some("tok-123".to_string());
        record
    }

    #[test]
    fn test_service_name_truncates_user_id() {
        assert_eq!(service_name_for_user("64f1b2c3d4e5f6a7"), "bot-64f1b2c3");
        assert_eq!(service_name_for_user("short"), "bot-short");
    }

    #[test]
    fn test_callback_url_derived_from_frontend_strips_port() {
        let config = test_config();
        assert_eq!(callback_base_url(&config), "http://localhost:3001");
    }

    #[test]
    fn test_callback_url_prefers_configured_backend_url() {
        let mut config = test_config();
        config.backend_url = Some("https://api.example.com/".to_string());
        assert_eq!(callback_base_url(&config), "https://api.example.com");
    }

    #[test]
    fn test_callback_url_handles_portless_frontend() {
        let mut config = test_config();
        config.frontend_url = "https://app.example.com".to_string();
        assert_eq!(callback_base_url(&config), "https://app.example.com:3001");
    }

    #[test]
    fn test_environment_contract_key_set() {
        let record = test_record();
        let config = test_config();
        let vars = build_environment(
            &record,
            &config,
            "svc_1",
            "pass",
            "gw-token",
            "http://localhost:3001",
        );

        for key in [
            "CLAWDBOT_STATE_DIR",
            "CLAWDBOT_WORKSPACE_DIR",
            "CLAWDBOT_GATEWAY_TOKEN",
            "SETUP_PASSWORD",
            "LLM_PROVIDER",
            "OPENAI_API_KEY",
            "TELEGRAM_TOKEN",
            "CALLBACK_URL",
            "BACKEND_API_URL",
            "RAILWAY_SERVICE_ID",
        ] {
            assert!(vars.contains_key(key), "missing {key}");
        }
        assert_eq!(vars["CLAWDBOT_STATE_DIR"], "/data/state");
        assert_eq!(vars["CALLBACK_URL"], "http://localhost:3001/api/callbacks");
        assert_eq!(vars["RAILWAY_SERVICE_ID"], "svc_1");
        assert_eq!(vars["LLM_PROVIDER"], "openai");
        // Channels the user never connected are absent, and default skills
        // are not serialized.
        assert!(!vars.contains_key("DISCORD_TOKEN"));
        assert!(!vars.contains_key("WHATSAPP_TOKEN"));
        assert!(!vars.contains_key("SKILLS"));
    }

    #[test]
    fn test_environment_includes_skills_when_non_default() {
        let mut record = test_record();
        record.skills.data_analysis = true;
        let config = test_config();
        let vars = build_environment(&record, &config, "svc_1", "p", "g", "http://b");

        let skills: serde_json::Value = serde_json::from_str(&vars["SKILLS"]).unwrap();
        assert_eq!(skills["dataAnalysis"], serde_json::json!(true));
    }
}
