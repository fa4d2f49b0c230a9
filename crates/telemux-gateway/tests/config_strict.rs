#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use telemux_gateway::config::{self, OverflowPolicy, RegistrationMode, StoreMode};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
buffer:
  flush_treshold: 5 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:3001");
    assert_eq!(cfg.gateway.ws_path, "/");
    assert_eq!(cfg.gateway.handshake_sentinel, "ESP32 Connected to WebSocket!");
    assert_eq!(cfg.registration.mode, RegistrationMode::Local);
    assert_eq!(cfg.store.mode, StoreMode::Memory);
    assert_eq!(cfg.buffer.flush_threshold, 100);
    assert_eq!(cfg.buffer.max_entries, 10_000);
    assert_eq!(cfg.buffer.overflow, OverflowPolicy::DropOldest);
}

#[test]
fn full_config_round_trips_fields() {
    let yaml = r#"
version: 1
gateway:
  listen: "127.0.0.1:9000"
  handshake_sentinel: "HELLO"
registration:
  mode: http
  api_url: "http://registry.local"
  timeout_ms: 2000
store:
  mode: http
  url: "http://store.local/frames"
buffer:
  flush_threshold: 50
  flush_interval_ms: 0
  max_entries: 500
  overflow: drop_newest
"#;
    let cfg = config::load_from_str(yaml).expect("must parse");
    assert_eq!(cfg.gateway.handshake_sentinel, "HELLO");
    assert_eq!(cfg.registration.api_url.as_deref(), Some("http://registry.local"));
    assert_eq!(cfg.store.mode, StoreMode::Http);
    assert_eq!(cfg.buffer.overflow, OverflowPolicy::DropNewest);
    assert_eq!(cfg.buffer.flush_interval_ms, 0);
}

#[test]
fn unsupported_version_rejected() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn http_registration_requires_url() {
    let yaml = "version: 1\nregistration:\n  mode: http\n";
    let err = config::load_from_str(yaml).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}

#[test]
fn max_entries_below_threshold_rejected() {
    let yaml = "version: 1\nbuffer:\n  flush_threshold: 200\n  max_entries: 100\n";
    assert!(config::load_from_str(yaml).is_err());
}

#[test]
fn idle_timeout_must_exceed_ping_interval() {
    let yaml = "version: 1\ngateway:\n  ping_interval_ms: 30000\n  idle_timeout_ms: 20000\n";
    assert!(config::load_from_str(yaml).is_err());
}

#[test]
fn ws_path_must_be_absolute_and_not_shadow_ops() {
    for path in ["ws", "/metrics", "/healthz"] {
        let yaml = format!("version: 1\ngateway:\n  ws_path: \"{path}\"\n");
        let err = config::load_from_str(&yaml).expect_err("must fail");
        assert_eq!(err.code().as_str(), "BAD_CONFIG", "path {path}");
    }
    let cfg = config::load_from_str("version: 1\ngateway:\n  ws_path: \"/telemetry\"\n").unwrap();
    assert_eq!(cfg.gateway.ws_path, "/telemetry");
}
