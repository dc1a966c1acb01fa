use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Explicit base URL deployed instances call back to. When unset it is
    /// derived from `frontend_url` and `listen_port`.
    #[serde(default)]
    pub backend_url: Option<String>,

    #[serde(default = "default_railway_api_url")]
    pub railway_api_url: String,

    #[serde(default)]
    pub railway_project_token: String,

    #[serde(default)]
    pub railway_project_id: String,

    #[serde(default = "default_template_repo")]
    pub template_repo: String,

    #[serde(default = "default_template_root")]
    pub template_root: String,

    #[serde(default = "default_volume_mount_path")]
    pub volume_mount_path: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    jwt_secret: Option<String>,
    listen_port: Option<u16>,
    frontend_url: Option<String>,
    backend_url: Option<String>,
    railway_api_url: Option<String>,
    railway_project_token: Option<String>,
    railway_project_id: Option<String>,
    template_repo: Option<String>,
    template_root: Option<String>,
    volume_mount_path: Option<String>,
    request_timeout_secs: Option<u64>,
}

fn default_listen_port() -> u16 {
    8080
}

fn default_frontend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_railway_api_url() -> String {
    "https://backboard.railway.app/graphql/v2".to_string()
}

fn default_template_repo() -> String {
    "vignesh07/clawdbot-railway-template".to_string()
}

fn default_template_root() -> String {
    "templates/agent-runtime".to_string()
}

fn default_volume_mount_path() -> String {
    "/data".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialServerConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))?
            } else {
                PartialServerConfig::default()
            }
        } else {
            PartialServerConfig::default()
        };

        // 2. Environment variables override file values
        let jwt_secret = env_or(file_config.jwt_secret, "JWT_SECRET")
            .ok_or_else(|| "JWT_SECRET must be set".to_string())?;

        let listen_port = match env::var("PORT").ok() {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .map_err(|e| format!("Invalid PORT value {raw:?}: {e}"))?,
            ),
            None => file_config.listen_port,
        };
        let request_timeout_secs = match env::var("REQUEST_TIMEOUT_SECS").ok() {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|e| format!("Invalid REQUEST_TIMEOUT_SECS value {raw:?}: {e}"))?,
            ),
            None => file_config.request_timeout_secs,
        };

        Ok(ServerConfig {
            jwt_secret,
            listen_port: listen_port.unwrap_or_else(default_listen_port),
            frontend_url: env_or(file_config.frontend_url, "FRONTEND_URL")
                .unwrap_or_else(default_frontend_url),
            backend_url: env_or(file_config.backend_url, "BACKEND_URL"),
            railway_api_url: env_or(file_config.railway_api_url, "RAILWAY_API_URL")
                .unwrap_or_else(default_railway_api_url),
            railway_project_token: env_or(file_config.railway_project_token, "RAILWAY_PROJECT_TOKEN")
                .unwrap_or_default(),
            railway_project_id: env_or(file_config.railway_project_id, "RAILWAY_PROJECT_ID")
                .unwrap_or_default(),
            template_repo: env_or(file_config.template_repo, "TEMPLATE_REPO")
                .unwrap_or_else(default_template_repo),
            template_root: env_or(file_config.template_root, "TEMPLATE_ROOT")
                .unwrap_or_else(default_template_root),
            volume_mount_path: env_or(file_config.volume_mount_path, "VOLUME_MOUNT_PATH")
                .unwrap_or_else(default_volume_mount_path),
            request_timeout_secs: request_timeout_secs.unwrap_or_else(default_request_timeout_secs),
        })
    }
}

fn env_or(file_value: Option<String>, key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty()).or(file_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_prefers_environment() {
        // Key chosen to not collide with real configuration.
        unsafe { env::set_var("AGENTHOST_TEST_ENV_OR", "from-env") };
        let merged = env_or(Some("from-file".to_string()), "AGENTHOST_TEST_ENV_OR");
        assert_eq!(merged.as_deref(), Some("from-env"));
        unsafe { env::remove_var("AGENTHOST_TEST_ENV_OR") };
    }

    #[test]
    fn test_env_or_falls_back_to_file() {
        let merged = env_or(Some("from-file".to_string()), "AGENTHOST_TEST_UNSET_KEY");
        assert_eq!(merged.as_deref(), Some("from-file"));
    }
}
