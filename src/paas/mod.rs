use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub mod railway;

pub use railway::RailwayClient;

#[derive(Debug, Error)]
pub enum PaasError {
    /// Provider project credentials are missing or invalid. Checked before
    /// any call is attempted; fatal to the whole orchestration, not retried.
    #[error("Provider credentials are missing or invalid")]
    AuthFailure,
    /// Network-level failure (connect, timeout). The caller may retry with
    /// backoff; this layer does not.
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] reqwest::Error),
    /// The control plane answered but reported a structural error. Surfaced
    /// verbatim; usually a request-shape or quota problem.
    #[error("Provider rejected the request: {0}")]
    ProviderRejected(String),
    /// The target project has zero environments to deploy into.
    #[error("No environment found in the target project")]
    NoEnvironmentFound,
    /// The response carried no error but is missing an expected field.
    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),
}

/// Typed client over the PaaS provider's control plane. Each operation is one
/// orchestration step: a single request/response unit.
#[async_trait]
pub trait PaasClient: Send + Sync {
    async fn resolve_default_environment(&self, project_id: &str) -> Result<String, PaasError>;

    async fn create_service(
        &self,
        project_id: &str,
        name: &str,
        source_repo: &str,
    ) -> Result<String, PaasError>;

    async fn set_service_root_path(
        &self,
        service_id: &str,
        environment_id: &str,
        path: &str,
    ) -> Result<(), PaasError>;

    async fn create_volume(
        &self,
        project_id: &str,
        environment_id: &str,
        service_id: &str,
        mount_path: &str,
    ) -> Result<String, PaasError>;

    async fn upsert_environment_variables(
        &self,
        project_id: &str,
        environment_id: &str,
        service_id: &str,
        variables: HashMap<String, String>,
    ) -> Result<(), PaasError>;

    async fn create_public_domain(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> Result<String, PaasError>;

    async fn delete_service(&self, service_id: &str) -> Result<(), PaasError>;
}
