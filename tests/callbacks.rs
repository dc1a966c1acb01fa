mod common;

use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::MockServer;

use agenthost::db::models::{InstanceRecord, LifecyclePhase, LlmProvider};
use agenthost::db::store::InstanceStore;
use common::{request_json, spawn_app};

async fn seed_deployed_record(app: &common::TestApp) {
    let mut record = InstanceRecord::new(
        app.user_id.clone(),
        LlmProvider::OpenAi,
        "sk-abc".to_string(),
    );
    record.telegram_token = Some("tok-123".to_string());
    record.service_id = Some("svc_1".to_string());
    record.domain = Some("svc1.example".to_string());
    record.setup_password = Some("a".repeat(32));
    record.is_deployed = true;
    record.phase = LifecyclePhase::Provisioning;
    app.store.upsert(record).await.unwrap();
}

#[tokio::test]
async fn test_configured_callback_sets_phase_and_timestamp() {
    let control_plane = MockServer::start().await;
    let app = spawn_app(&control_plane).await;
    seed_deployed_record(&app).await;

    let (status, body) = request_json(
        &app.router,
        "POST",
        "/api/callbacks/status",
        None,
        Some(json!({
            "instanceId": "svc_1",
            "status": "configured",
            "timestamp": "2025-01-01T00:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], json!(true));

    let record = app.store.get_by_user(&app.user_id).await.unwrap().unwrap();
    assert_eq!(record.phase, LifecyclePhase::Configured);
    assert_eq!(
        record.configured_at,
        Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_configured_callback_replay_is_idempotent() {
    let control_plane = MockServer::start().await;
    let app = spawn_app(&control_plane).await;
    seed_deployed_record(&app).await;

    let payload = json!({
        "instanceId": "svc_1",
        "status": "configured",
        "timestamp": "2025-01-01T00:00:00Z"
    });
    request_json(&app.router, "POST", "/api/callbacks/status", None, Some(payload.clone())).await;
    let (status, _) =
        request_json(&app.router, "POST", "/api/callbacks/status", None, Some(payload)).await;
    assert_eq!(status, StatusCode::OK);

    let record = app.store.get_by_user(&app.user_id).await.unwrap().unwrap();
    assert_eq!(record.phase, LifecyclePhase::Configured);
    assert_eq!(
        record.configured_at,
        Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn test_error_status_is_recorded_without_regressing_phase() {
    let control_plane = MockServer::start().await;
    let app = spawn_app(&control_plane).await;
    seed_deployed_record(&app).await;

    request_json(
        &app.router,
        "POST",
        "/api/callbacks/status",
        None,
        Some(json!({ "instanceId": "svc_1", "status": "configured" })),
    )
    .await;
    let (status, _) = request_json(
        &app.router,
        "POST",
        "/api/callbacks/status",
        None,
        Some(json!({
            "instanceId": "svc_1",
            "status": "error",
            "error": "gateway restart loop"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let record = app.store.get_by_user(&app.user_id).await.unwrap().unwrap();
    assert_eq!(record.phase, LifecyclePhase::Configured);

    let (_, logs) =
        request_json(&app.router, "GET", "/api/agent/logs", Some(&app.token), None).await;
    let entries = logs["logs"].as_array().unwrap();
    assert!(
        entries
            .iter()
            .any(|e| e["message"].as_str().unwrap().contains("gateway restart loop")
                && e["level"] == json!("error"))
    );
}

#[tokio::test]
async fn test_health_callback_replaces_snapshot_last_write_wins() {
    let control_plane = MockServer::start().await;
    let app = spawn_app(&control_plane).await;
    seed_deployed_record(&app).await;

    request_json(
        &app.router,
        "POST",
        "/api/callbacks/health",
        None,
        Some(json!({
            "instanceId": "svc_1",
            "uptimeMs": 120000,
            "configured": true,
            "gatewayRunning": true,
            "gatewayReachable": true
        })),
    )
    .await;
    // A later report with lower uptime (e.g. after a restart) still wins.
    let (status, _) = request_json(
        &app.router,
        "POST",
        "/api/callbacks/health",
        None,
        Some(json!({
            "instanceId": "svc_1",
            "uptimeMs": 90000,
            "gatewayReachable": false,
            "lastError": "gateway unreachable"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let record = app.store.get_by_user(&app.user_id).await.unwrap().unwrap();
    let health = record.health.unwrap();
    assert_eq!(health.uptime_ms, 90000);
    assert!(!health.gateway_reachable);
    // Fields absent from the second report fall back to defaults rather than
    // merging with the first report.
    assert!(!health.gateway_running);
    assert_eq!(health.last_error.as_deref(), Some("gateway unreachable"));
}

#[tokio::test]
async fn test_callbacks_distinguish_malformed_from_unknown_instance() {
    let control_plane = MockServer::start().await;
    let app = spawn_app(&control_plane).await;
    seed_deployed_record(&app).await;

    let (status, _) = request_json(
        &app.router,
        "POST",
        "/api/callbacks/status",
        None,
        Some(json!({ "status": "configured" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request_json(
        &app.router,
        "POST",
        "/api/callbacks/status",
        None,
        Some(json!({ "instanceId": "svc_unknown", "status": "configured" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request_json(
        &app.router,
        "POST",
        "/api/callbacks/health",
        None,
        Some(json!({ "uptimeMs": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request_json(
        &app.router,
        "POST",
        "/api/callbacks/health",
        None,
        Some(json!({ "instanceId": "svc_unknown", "uptimeMs": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
