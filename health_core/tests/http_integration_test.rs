use axum::body::Body;
use axum::http::{Request, StatusCode};
use health_core::{
    create_app, AppConfig, AppState, CheckResult, DeploymentDescriptor, DeploymentId, FnProcedure, SharedProcedure,
    StaticDiscovery,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn up(name: &str) -> SharedProcedure {
    let result_name = name.to_string();
    FnProcedure::shared(name, move || Ok(CheckResult::up(result_name.clone())))
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, Value) {
    let response = create_app(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_empty_server_is_up_everywhere() {
    let state = AppState::default();

    for uri in ["/health", "/health/live", "/health/ready", "/health/general"] {
        let (status, body) = get(&state, uri).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body, json!({ "status": "UP", "checks": [] }), "{}", uri);
    }
}

#[tokio::test]
async fn test_deployment_checks_are_served() {
    let state = AppState::default();
    let descriptor = DeploymentDescriptor::new(DeploymentId::new("shop.war"));
    let discovery = StaticDiscovery::new()
        .with_liveness_check(up("heartbeat"))
        .with_check(FnProcedure::shared("inventory", || {
            Ok(CheckResult::up("inventory").with_data("items", 42))
        }));
    state.lifecycle.on_deployed(&descriptor, &discovery);

    let (status, body) = get(&state, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "UP", "checks": [{ "name": "ready-shop.war", "status": "UP" }] }));

    let (status, body) = get(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "status": "UP",
            "checks": [
                { "name": "inventory", "status": "UP", "data": { "items": 42 } },
                { "name": "heartbeat", "status": "UP" },
                { "name": "ready-shop.war", "status": "UP" }
            ]
        })
    );
}

#[tokio::test]
async fn test_down_report_maps_to_service_unavailable() {
    let state = AppState::default();
    let descriptor = DeploymentDescriptor::new(DeploymentId::new("broken.war"));
    let discovery = StaticDiscovery::new()
        .with_liveness_check(FnProcedure::shared("disk", || Err(anyhow::anyhow!("disk full"))));
    state.lifecycle.on_deployed(&descriptor, &discovery);

    let (status, body) = get(&state, "/health/live").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body,
        json!({ "status": "DOWN", "checks": [{ "name": "disk", "status": "DOWN", "data": { "error": "disk full" } }] })
    );

    let (status, _) = get(&state, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&state, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "DOWN");

    state.lifecycle.on_undeployed(&descriptor.id);
    let (status, _) = get(&state, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_category_is_not_found() {
    let state = AppState::default();

    let (status, body) = get(&state, "/health/started").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"], "unknown health category 'started'");
}

#[tokio::test]
async fn test_server_wide_default_procedure_switch() {
    let mut config = AppConfig::default();
    config.health.disable_default_procedures = true;
    let state = AppState::from_config(&config);

    state
        .lifecycle
        .on_deployed(&DeploymentDescriptor::new(DeploymentId::new("quiet.war")), &StaticDiscovery::new());

    let (status, body) = get(&state, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "UP", "checks": [] }));
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let state = AppState::default();

    let (status, body) = get(&state, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["readiness"], "/health/ready");
    assert_eq!(body["app"], state.app_name);
}
