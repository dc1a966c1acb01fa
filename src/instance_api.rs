use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::db::models::{LlmProvider, SkillUpdate};

/// Fixed administrative username on every deployed instance; the password is
/// the per-instance setup password.
const ADMIN_USERNAME: &str = "admin";

#[derive(Debug, Error)]
pub enum InstanceApiError {
    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Instance rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Typed partial configuration update forwarded to a running instance.
/// Absent fields are left untouched on both the instance and the local
/// record; skills merge key-by-key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discord_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_provider: Option<LlmProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<SkillUpdate>,
}

/// Client for the administrative API a deployed instance exposes on its
/// public domain. Configuration edits flow here directly, bypassing the
/// control plane.
pub struct InstanceApiClient {
    http: Client,
}

impl InstanceApiClient {
    pub fn new(request_timeout: Duration) -> Result<Self, InstanceApiError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(InstanceApiClient { http })
    }

    /// Forwards a partial configuration update to the instance. Returns the
    /// instance's response body so the caller can reconcile local state only
    /// after the remote accepted the change.
    pub async fn push_config(
        &self,
        domain: &str,
        setup_password: &str,
        update: &ConfigUpdate,
    ) -> Result<Value, InstanceApiError> {
        self.post_admin(domain, setup_password, "/api/admin/config", update)
            .await
    }

    /// Pushes a skill update. Same channel as `push_config`, kept separate so
    /// callers can treat it as best-effort next to a local-only skill edit.
    pub async fn push_skills(
        &self,
        domain: &str,
        setup_password: &str,
        skills: &SkillUpdate,
    ) -> Result<Value, InstanceApiError> {
        self.post_admin(
            domain,
            setup_password,
            "/api/admin/config",
            &json!({ "skills": skills }),
        )
        .await
    }

    async fn post_admin<T: Serialize + ?Sized>(
        &self,
        domain: &str,
        setup_password: &str,
        path: &str,
        body: &T,
    ) -> Result<Value, InstanceApiError> {
        let url = format!("{}{path}", admin_base(domain));
        debug!(url = %url, "Pushing configuration to instance");

        let response = self
            .http
            .post(&url)
            .basic_auth(ADMIN_USERNAME, Some(setup_password))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(InstanceApiError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await.unwrap_or(Value::Null))
    }
}

/// Provisioned domains are bare hostnames served over HTTPS; a domain that
/// already carries a scheme (local testing) is used as-is.
fn admin_base(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.trim_end_matches('/').to_string()
    } else {
        format!("https://{domain}")
    }
}
