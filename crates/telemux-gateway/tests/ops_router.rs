#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use telemux_core::protocol::frame::RawFrame;
use telemux_gateway::app_state::AppState;
use telemux_gateway::collab::MemoryFrameStore;
use telemux_gateway::config::GatewayConfig;
use telemux_gateway::router;

use support::{test_config, CountingRegistrar};

fn state_with(cfg: GatewayConfig) -> AppState {
    AppState::with_collaborators(cfg, Arc::new(CountingRegistrar::default()), Arc::new(MemoryFrameStore::new()))
}

async fn get(state: &AppState, uri: &str) -> (StatusCode, String) {
    let resp = router::build_router(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn healthz_is_always_ok() {
    let state = state_with(test_config());
    assert_eq!(get(&state, "/healthz").await, (StatusCode::OK, "ok".to_string()));
    state.set_draining();
    assert_eq!(get(&state, "/healthz").await.0, StatusCode::OK);
}

#[tokio::test]
async fn readyz_turns_unavailable_when_draining() {
    let state = state_with(test_config());
    assert_eq!(get(&state, "/readyz").await, (StatusCode::OK, "ready".to_string()));

    state.set_draining();
    assert_eq!(
        get(&state, "/readyz").await,
        (StatusCode::SERVICE_UNAVAILABLE, "draining".to_string())
    );
}

#[tokio::test]
async fn metrics_render_point_in_time_gauges() {
    let state = state_with(test_config());
    state
        .gateway()
        .buffer()
        .enqueue(Arc::from("dev-1"), RawFrame::new(0x120, vec![0; 8]));
    state.metrics().messages_discarded.inc(&[("reason", "oversize")]);
    state.set_draining();

    let (status, body) = get(&state, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("telemux_buffer_depth 1"), "{body}");
    assert!(body.contains("telemux_connections_registered 0"), "{body}");
    assert!(body.contains("telemux_devices_registered 0"), "{body}");
    assert!(body.contains("telemux_draining 1"), "{body}");
    assert!(body.contains(r#"telemux_messages_discarded_total{reason="oversize"} 1"#), "{body}");
}

#[tokio::test]
async fn websocket_paths_are_routed() {
    let state = state_with(test_config());

    // a plain GET reaches the upgrade handler and is rejected there, not 404
    for path in ["/", "/v1/ws"] {
        let (status, _) = get(&state, path).await;
        assert_ne!(status, StatusCode::NOT_FOUND, "path {path}");
    }
    assert_eq!(get(&state, "/nope").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn custom_ws_path_is_routed() {
    let mut cfg = test_config();
    cfg.gateway.ws_path = "/telemetry".into();
    let state = state_with(cfg);

    assert_ne!(get(&state, "/telemetry").await.0, StatusCode::NOT_FOUND);
    assert_ne!(get(&state, "/v1/ws").await.0, StatusCode::NOT_FOUND);
    assert_eq!(get(&state, "/").await.0, StatusCode::NOT_FOUND);
}
