use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error};

use super::{PaasClient, PaasError};

/// Client for the Railway GraphQL v2 control plane.
///
/// Every operation is a single POST carrying `{query, variables}`,
/// authenticated with a long-lived project-scoped token in both the
/// `Authorization` and `Project-Access-Token` headers.
pub struct RailwayClient {
    http: Client,
    api_url: String,
    project_token: String,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl RailwayClient {
    pub fn new(
        api_url: String,
        project_token: String,
        request_timeout: Duration,
    ) -> Result<Self, PaasError> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(RailwayClient {
            http,
            api_url,
            project_token,
        })
    }

    async fn execute(&self, query: &str, variables: Value) -> Result<Value, PaasError> {
        if self.project_token.is_empty() {
            return Err(PaasError::AuthFailure);
        }

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.project_token)
            .header("Project-Access-Token", &self.project_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let body: GraphQlResponse = response.json().await?;

        if let Some(errors) = body.errors {
            if let Some(first) = errors.first() {
                error!(message = %first.message, "Control plane reported a GraphQL error");
                return Err(PaasError::ProviderRejected(first.message.clone()));
            }
        }

        body.data
            .ok_or_else(|| PaasError::UnexpectedResponse("response carried no data".to_string()))
    }

    fn extract_str(data: &Value, pointer: &str) -> Result<String, PaasError> {
        data.pointer(pointer)
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .ok_or_else(|| PaasError::UnexpectedResponse(format!("missing field at {pointer}")))
    }
}

#[async_trait]
impl PaasClient for RailwayClient {
    async fn resolve_default_environment(&self, project_id: &str) -> Result<String, PaasError> {
        let query = r#"
            query GetProject($id: String!) {
              project(id: $id) {
                environments {
                  edges {
                    node {
                      id
                      name
                    }
                  }
                }
              }
            }
        "#;
        let data = self.execute(query, json!({ "id": project_id })).await?;

        let edges = data
            .pointer("/project/environments/edges")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                PaasError::UnexpectedResponse("missing environments in project".to_string())
            })?;
        if edges.is_empty() {
            return Err(PaasError::NoEnvironmentFound);
        }
        // First environment is the provider's default (usually "production").
        Self::extract_str(&edges[0], "/node/id")
    }

    async fn create_service(
        &self,
        project_id: &str,
        name: &str,
        source_repo: &str,
    ) -> Result<String, PaasError> {
        let query = r#"
            mutation ServiceCreate($input: ServiceCreateInput!) {
              serviceCreate(input: $input) {
                id
                name
              }
            }
        "#;
        let variables = json!({
            "input": {
                "projectId": project_id,
                "name": name,
                "source": { "repo": source_repo }
            }
        });
        let data = self.execute(query, variables).await?;
        debug!(service_name = name, "Created control-plane service");
        Self::extract_str(&data, "/serviceCreate/id")
    }

    async fn set_service_root_path(
        &self,
        service_id: &str,
        environment_id: &str,
        path: &str,
    ) -> Result<(), PaasError> {
        let query = r#"
            mutation ServiceInstanceUpdate($serviceId: String!, $environmentId: String!, $input: ServiceInstanceUpdateInput!) {
              serviceInstanceUpdate(serviceId: $serviceId, environmentId: $environmentId, input: $input)
            }
        "#;
        let variables = json!({
            "serviceId": service_id,
            "environmentId": environment_id,
            "input": { "rootDirectory": path }
        });
        self.execute(query, variables).await?;
        Ok(())
    }

    async fn create_volume(
        &self,
        project_id: &str,
        environment_id: &str,
        service_id: &str,
        mount_path: &str,
    ) -> Result<String, PaasError> {
        let query = r#"
            mutation VolumeCreate($input: VolumeCreateInput!) {
              volumeCreate(input: $input) {
                id
              }
            }
        "#;
        let variables = json!({
            "input": {
                "projectId": project_id,
                "environmentId": environment_id,
                "serviceId": service_id,
                "mountPath": mount_path
            }
        });
        let data = self.execute(query, variables).await?;
        Self::extract_str(&data, "/volumeCreate/id")
    }

    async fn upsert_environment_variables(
        &self,
        project_id: &str,
        environment_id: &str,
        service_id: &str,
        variables: HashMap<String, String>,
    ) -> Result<(), PaasError> {
        let query = r#"
            mutation VariableCollectionUpsert($input: VariableCollectionUpsertInput!) {
              variableCollectionUpsert(input: $input)
            }
        "#;
        let input = json!({
            "input": {
                "projectId": project_id,
                "environmentId": environment_id,
                "serviceId": service_id,
                "variables": variables
            }
        });
        self.execute(query, input).await?;
        Ok(())
    }

    async fn create_public_domain(
        &self,
        environment_id: &str,
        service_id: &str,
    ) -> Result<String, PaasError> {
        let query = r#"
            mutation ServiceDomainCreate($input: ServiceDomainCreateInput!) {
              serviceDomainCreate(input: $input) {
                domain
              }
            }
        "#;
        let variables = json!({
            "input": {
                "environmentId": environment_id,
                "serviceId": service_id
            }
        });
        let data = self.execute(query, variables).await?;
        Self::extract_str(&data, "/serviceDomainCreate/domain")
    }

    async fn delete_service(&self, service_id: &str) -> Result<(), PaasError> {
        let query = r#"
            mutation ServiceDelete($id: String!) {
              serviceDelete(id: $id)
            }
        "#;
        self.execute(query, json!({ "id": service_id })).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_str_missing_field_is_unexpected_response() {
        let data = json!({ "serviceCreate": { "name": "bot-1" } });
        let err = RailwayClient::extract_str(&data, "/serviceCreate/id").unwrap_err();
        assert!(matches!(err, PaasError::UnexpectedResponse(_)));
    }

    #[tokio::test]
    async fn test_empty_project_token_fails_before_any_request() {
        // Unroutable address: reaching the network would surface as transport
        // failure instead of auth failure.
        let client = RailwayClient::new(
            "http://127.0.0.1:1/graphql/v2".to_string(),
            String::new(),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client.resolve_default_environment("proj").await.unwrap_err();
        assert!(matches!(err, PaasError::AuthFailure));
    }
}
