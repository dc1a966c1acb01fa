use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported LLM backends for a deployed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Deepseek,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Deepseek => "deepseek",
        }
    }
}

/// Lifecycle phase persisted on the record. Health is an orthogonal axis
/// layered on top of `Configured`, not a separate phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Offline,
    Provisioning,
    Configured,
}

/// Status projection exposed to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalStatus {
    NotDeployed,
    Provisioning,
    Configured,
    Offline,
}

/// Fixed set of boolean feature flags controlling optional instance
/// capabilities. Defaults are all off; each flag is independently togglable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillSet {
    #[serde(default)]
    pub email_processing: bool,
    #[serde(default)]
    pub schedule_management: bool,
    #[serde(default)]
    pub data_analysis: bool,
    #[serde(default)]
    pub report_generation: bool,
    #[serde(default)]
    pub task_automation: bool,
    #[serde(default)]
    pub customer_support: bool,
}

/// Partial skill update. Only the keys present in the request are touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_processing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_management: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_analysis: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_generation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_automation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_support: Option<bool>,
}

impl SkillSet {
    /// Merges a partial update key-by-key, leaving absent keys untouched.
    pub fn apply(&mut self, update: &SkillUpdate) {
        if let Some(v) = update.email_processing {
            self.email_processing = v;
        }
        if let Some(v) = update.schedule_management {
            self.schedule_management = v;
        }
        if let Some(v) = update.data_analysis {
            self.data_analysis = v;
        }
        if let Some(v) = update.report_generation {
            self.report_generation = v;
        }
        if let Some(v) = update.task_automation {
            self.task_automation = v;
        }
        if let Some(v) = update.customer_support {
            self.customer_support = v;
        }
    }
}

/// Last health report from the instance. Wholly overwritten by each report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub uptime_ms: i64,
    pub configured: bool,
    pub gateway_running: bool,
    pub gateway_reachable: bool,
    pub last_error: Option<String>,
    pub reported_at: DateTime<Utc>,
}

/// One per user; at most one active instance per user.
///
/// The three deployment-handle fields (`service_id`, `domain`,
/// `setup_password`) are either all `None` (never deployed / torn down) or
/// all `Some` (actively deployed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub user_id: String,

    pub telegram_token: Option<String>,
    pub discord_token: Option<String>,
    pub whatsapp_token: Option<String>,

    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    pub system_prompt: Option<String>,

    pub service_id: Option<String>,
    pub domain: Option<String>,
    pub setup_password: Option<String>,

    pub is_deployed: bool,
    pub phase: LifecyclePhase,
    pub configured_at: Option<DateTime<Utc>>,
    pub health: Option<HealthSnapshot>,

    pub skills: SkillSet,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstanceRecord {
    pub fn new(user_id: String, llm_provider: LlmProvider, llm_api_key: String) -> Self {
        let now = Utc::now();
        InstanceRecord {
            user_id,
            telegram_token: None,
            discord_token: None,
            whatsapp_token: None,
            llm_provider,
            llm_api_key,
            system_prompt: None,
            service_id: None,
            domain: None,
            setup_password: None,
            is_deployed: false,
            phase: LifecyclePhase::Offline,
            configured_at: None,
            health: None,
            skills: SkillSet::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True when every deployment-handle field is populated.
    pub fn has_handle(&self) -> bool {
        self.service_id.is_some() && self.domain.is_some() && self.setup_password.is_some()
    }

    pub fn channel_token_count(&self) -> usize {
        [&self.telegram_token, &self.discord_token, &self.whatsapp_token]
            .iter()
            .filter(|t| t.is_some())
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Warn,
    Error,
}

/// Append-only activity entry; every state transition and callback lands here
/// so failures are diagnosable after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub user_id: String,
    pub message: String,
    pub level: ActivityLevel,
    pub created_at: DateTime<Utc>,
}
