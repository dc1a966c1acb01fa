use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use agenthost::db::store::{InstanceStore, MemoryStore, UserStore};
use agenthost::instance_api::InstanceApiClient;
use agenthost::orchestrator::Orchestrator;
use agenthost::paas::RailwayClient;
use agenthost::server::config::ServerConfig;
use agenthost::services::auth_service;
use agenthost::web::{AppState, create_axum_router};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub token: String,
    pub user_id: String,
}

/// Builds the full application against a wiremock control plane and one
/// pre-registered operator user.
pub async fn spawn_app(control_plane: &MockServer) -> TestApp {
    let config = Arc::new(ServerConfig {
        jwt_secret: "test-secret".to_string(),
        listen_port: 3001,
        frontend_url: "http://localhost:3000".to_string(),
        backend_url: None,
        railway_api_url: format!("{}/graphql/v2", control_plane.uri()),
        railway_project_token: "proj-token".to_string(),
        railway_project_id: "proj-1".to_string(),
        template_repo: "vignesh07/clawdbot-railway-template".to_string(),
        template_root: "templates/agent-runtime".to_string(),
        volume_mount_path: "/data".to_string(),
        request_timeout_secs: 5,
    });

    let railway = Arc::new(
        RailwayClient::new(
            config.railway_api_url.clone(),
            config.railway_project_token.clone(),
            Duration::from_secs(5),
        )
        .unwrap(),
    );
    let orchestrator = Arc::new(Orchestrator::new(railway, config.clone()));
    let instance_api = Arc::new(InstanceApiClient::new(Duration::from_secs(5)).unwrap());

    let store = Arc::new(MemoryStore::new());
    let app_state = Arc::new(AppState {
        instances: store.clone() as Arc<dyn InstanceStore>,
        users: store.clone() as Arc<dyn UserStore>,
        orchestrator,
        instance_api,
        config: config.clone(),
    });

    let user = store
        .create_user("operator".to_string(), "unused-hash".to_string())
        .await
        .unwrap();
    let login = auth_service::create_jwt_for_user(&user, &config.jwt_secret).unwrap();

    TestApp {
        router: create_axum_router(app_state),
        store,
        token: login.token,
        user_id: user.id,
    }
}

pub async fn request_json(
    router: &Router,
    http_method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(http_method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Mounts success responses for each step of the provisioning sequence, every
/// one expected exactly once.
pub async fn mount_happy_provisioning(control_plane: &MockServer) {
    mount_graphql(
        control_plane,
        "GetProject",
        serde_json::json!({
            "data": { "project": { "environments": { "edges": [
                { "node": { "id": "env_1", "name": "production" } }
            ] } } }
        }),
        Some(1),
    )
    .await;
    mount_graphql(
        control_plane,
        "ServiceCreate",
        serde_json::json!({ "data": { "serviceCreate": { "id": "svc_1", "name": "bot-user" } } }),
        Some(1),
    )
    .await;
    mount_graphql(
        control_plane,
        "ServiceInstanceUpdate",
        serde_json::json!({ "data": { "serviceInstanceUpdate": true } }),
        Some(1),
    )
    .await;
    mount_graphql(
        control_plane,
        "VolumeCreate",
        serde_json::json!({ "data": { "volumeCreate": { "id": "vol_1" } } }),
        Some(1),
    )
    .await;
    mount_graphql(
        control_plane,
        "VariableCollectionUpsert",
        serde_json::json!({ "data": { "variableCollectionUpsert": true } }),
        Some(1),
    )
    .await;
    mount_graphql(
        control_plane,
        "ServiceDomainCreate",
        serde_json::json!({ "data": { "serviceDomainCreate": { "domain": "svc1.example" } } }),
        Some(1),
    )
    .await;
}

pub async fn mount_graphql(
    control_plane: &MockServer,
    operation: &str,
    response: Value,
    expect: Option<u64>,
) {
    let mut mock = Mock::given(method("POST"))
        .and(path("/graphql/v2"))
        .and(body_string_contains(operation))
        .respond_with(ResponseTemplate::new(200).set_body_json(response));
    if let Some(times) = expect {
        mock = mock.expect(times);
    }
    mock.mount(control_plane).await;
}
