#![allow(dead_code)]

//! Shared fixtures for gateway integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};

use telemux_core::decoder::DecoderRegistry;
use telemux_core::error::{GatewayError, Result};
use telemux_core::protocol::frame::RawFrame;
use telemux_gateway::collab::{DeviceRegistrar, FrameRecord, FrameStore, MemoryFrameStore, RegistrationSeed};
use telemux_gateway::config::GatewayConfig;
use telemux_gateway::obs::GatewayMetrics;
use telemux_gateway::realtime::{ConnId, Gateway};

pub use telemux_core::protocol::inbound::DEFAULT_HANDSHAKE_SENTINEL as DEFAULT_SENTINEL;

pub const BATTERY_PAYLOAD: [u8; 8] = [0x15, 0xE0, 0x00, 0x19, 0x1C, 0x00, 0x55, 0x5C];

/// Config with periodic flush disabled and a small threshold.
pub fn test_config() -> GatewayConfig {
    let mut cfg = GatewayConfig::default();
    cfg.buffer.flush_interval_ms = 0;
    cfg
}

/// Registrar handing out `dev-1`, `dev-2`, ... and counting calls.
#[derive(Default)]
pub struct CountingRegistrar {
    pub calls: AtomicUsize,
}

#[async_trait]
impl DeviceRegistrar for CountingRegistrar {
    async fn register(&self, _seed: RegistrationSeed) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("dev-{n}"))
    }
}

pub struct FailingRegistrar;

#[async_trait]
impl DeviceRegistrar for FailingRegistrar {
    async fn register(&self, _seed: RegistrationSeed) -> Result<String> {
        Err(GatewayError::RegistrationFailure("device api unreachable".into()))
    }
}

/// Registrar that holds every call until `release` is notified.
pub struct GatedRegistrar {
    pub release: Notify,
    pub id: String,
}

impl GatedRegistrar {
    pub fn new(id: &str) -> Self {
        Self {
            release: Notify::new(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl DeviceRegistrar for GatedRegistrar {
    async fn register(&self, _seed: RegistrationSeed) -> Result<String> {
        self.release.notified().await;
        Ok(self.id.clone())
    }
}

/// Store that fails the first `failures` batches, optionally blocking each
/// insert until `release` is notified.
pub struct FlakyStore {
    failures_left: AtomicUsize,
    pub attempts: AtomicUsize,
    pub inner: MemoryFrameStore,
    gated: bool,
    pub started: Notify,
    pub release: Notify,
}

impl FlakyStore {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
            inner: MemoryFrameStore::new(),
            gated: false,
            started: Notify::new(),
            release: Notify::new(),
        }
    }

    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::failing(0)
        }
    }
}

#[async_trait]
impl FrameStore for FlakyStore {
    async fn insert_batch(&self, records: Vec<FrameRecord>) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.gated {
            self.started.notify_one();
            self.release.notified().await;
        }
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(GatewayError::PersistenceFailure("store offline".into()));
        }
        self.inner.insert_batch(records).await
    }

    async fn query_recent(&self, device_id: Option<&str>, limit: usize) -> Result<Vec<FrameRecord>> {
        self.inner.query_recent(device_id, limit).await
    }
}

pub fn gateway_with(
    cfg: &GatewayConfig,
    registrar: Arc<dyn DeviceRegistrar>,
    store: Arc<dyn FrameStore>,
) -> (Arc<Gateway>, Arc<GatewayMetrics>) {
    let metrics = Arc::new(GatewayMetrics::default());
    let gw = Gateway::new(cfg, DecoderRegistry::with_builtin(), registrar, store, Arc::clone(&metrics));
    (gw, metrics)
}

/// Open a connection and swallow its welcome message.
pub fn connect(gw: &Gateway) -> (ConnId, mpsc::Receiver<Message>) {
    let (tx, mut rx) = mpsc::channel(64);
    let conn = gw.open(tx);
    let welcome = drain_json(&mut rx);
    assert_eq!(welcome.len(), 1);
    assert_eq!(welcome[0]["type"], "welcome");
    (conn, rx)
}

/// Every text message queued so far, parsed as JSON.
pub fn drain_json(rx: &mut mpsc::Receiver<Message>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Ok(m) = rx.try_recv() {
        if let Message::Text(s) = m {
            out.push(serde_json::from_str(&s).expect("outbound message is json"));
        }
    }
    out
}

pub fn frame(id: u32, payload: &[u8]) -> RawFrame {
    RawFrame::new(id, payload.to_vec())
}
