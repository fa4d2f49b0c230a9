#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::extract::ws::Message;
use serde_json::json;
use tokio::sync::mpsc;

use telemux_gateway::obs::GatewayMetrics;
use telemux_gateway::realtime::{BroadcastReport, BroadcastRouter, ConnectionRegistry};

fn setup() -> (Arc<ConnectionRegistry>, BroadcastRouter, Arc<GatewayMetrics>) {
    let registry = Arc::new(ConnectionRegistry::new());
    let metrics = Arc::new(GatewayMetrics::default());
    let router = BroadcastRouter::new(Arc::clone(&registry), Arc::clone(&metrics));
    (registry, router, metrics)
}

#[test]
fn origin_never_receives_its_own_payload() {
    let (registry, router, _) = setup();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    let (tx_c, mut rx_c) = mpsc::channel(8);
    let a = registry.insert(tx_a);
    registry.insert(tx_b);
    registry.insert(tx_c);

    let report = router.broadcast(Some(a), &json!({"type": "ping"})).unwrap();
    assert_eq!(report.delivered, 2);

    assert!(rx_a.try_recv().is_err());
    for rx in [&mut rx_b, &mut rx_c] {
        match rx.try_recv().unwrap() {
            Message::Text(s) => assert_eq!(s, r#"{"type":"ping"}"#),
            other => panic!("unexpected message {other:?}"),
        }
    }
}

#[test]
fn lone_origin_delivers_nothing() {
    let (registry, router, _) = setup();
    let (tx, mut rx) = mpsc::channel(8);
    let a = registry.insert(tx);

    let report = router.broadcast(Some(a), &json!({"n": 1})).unwrap();
    assert_eq!(report, BroadcastReport::default());
    assert!(rx.try_recv().is_err());
}

#[test]
fn no_origin_reaches_everyone() {
    let (registry, router, _) = setup();
    let mut rxs = Vec::new();
    for _ in 0..3 {
        let (tx, rx) = mpsc::channel(8);
        registry.insert(tx);
        rxs.push(rx);
    }

    let report = router.broadcast(None, &json!({"n": 1})).unwrap();
    assert_eq!(report.delivered, 3);
    assert!(rxs.iter_mut().all(|rx| rx.try_recv().is_ok()));
}

#[test]
fn closed_recipients_are_skipped() {
    let (registry, router, _) = setup();
    let (tx_a, rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    registry.insert(tx_a);
    registry.insert(tx_b);
    drop(rx_a);

    let report = router.broadcast(None, &json!({"n": 1})).unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.skipped_closed, 1);
    assert!(rx_b.try_recv().is_ok());
}

#[test]
fn full_queue_is_counted_not_fatal() {
    let (registry, router, metrics) = setup();
    let (tx_slow, _rx_slow) = mpsc::channel(1);
    let (tx_ok, mut rx_ok) = mpsc::channel(8);
    tx_slow.try_send(Message::Text("backlog".into())).unwrap();
    registry.insert(tx_slow);
    registry.insert(tx_ok);

    let report = router.broadcast(None, &json!({"n": 1})).unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(metrics.broadcast_send_failures.get(&[("reason", "queue_full")]), 1);
    assert!(rx_ok.try_recv().is_ok());
}

#[test]
fn send_to_unknown_connection_fails() {
    let (registry, router, _) = setup();
    let (tx, _rx) = mpsc::channel(8);
    let a = registry.insert(tx);
    registry.remove(a);

    let err = router.send_to(a, &json!({"n": 1})).expect_err("connection removed");
    assert_eq!(err.code().as_str(), "SEND_FAILURE");
}

#[test]
fn default_registry_numbers_like_new() {
    let (tx, _rx) = mpsc::channel(1);
    let a = ConnectionRegistry::default().insert(tx.clone());
    let b = ConnectionRegistry::new().insert(tx);
    assert_eq!(a, b);
    assert_eq!(a.get(), 1);
}
