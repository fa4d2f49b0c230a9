//! Shared application state for the telemux gateway.
//!
//! Builds the collaborators named by config, owns the [`Gateway`], and carries
//! the drain signal used for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use telemux_core::decoder::DecoderRegistry;
use telemux_core::error::{GatewayError, Result};

use crate::collab::{
    DeviceRegistrar, FrameStore, HttpFrameStore, HttpRegistrar, LocalRegistrar, MemoryFrameStore,
};
use crate::config::{GatewayConfig, RegistrationMode, StoreMode};
use crate::obs::GatewayMetrics;
use crate::realtime::Gateway;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    gateway: Arc<Gateway>,
    metrics: Arc<GatewayMetrics>,
    drain_tx: watch::Sender<bool>,
}

impl AppState {
    /// Build application state with collaborators selected by config.
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let registrar = build_registrar(&cfg)?;
        let store = build_store(&cfg)?;
        Ok(Self::with_collaborators(cfg, registrar, store))
    }

    /// Build with explicit collaborators (tests, embedding).
    pub fn with_collaborators(
        cfg: GatewayConfig,
        registrar: Arc<dyn DeviceRegistrar>,
        store: Arc<dyn FrameStore>,
    ) -> Self {
        let metrics = Arc::new(GatewayMetrics::default());
        let decoders = DecoderRegistry::with_builtin();
        tracing::info!(frame_ids = ?decoders.registered_ids(), "decoders registered");

        let gateway = Gateway::new(&cfg, decoders, registrar, store, Arc::clone(&metrics));
        let (drain_tx, _) = watch::channel(false);

        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                gateway,
                metrics,
                drain_tx,
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn gateway(&self) -> Arc<Gateway> {
        Arc::clone(&self.inner.gateway)
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Flip to draining: `/readyz` turns 503, new upgrades are refused and
    /// open sessions close.
    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
        self.inner.drain_tx.send_replace(true);
    }

    pub fn subscribe_drain(&self) -> watch::Receiver<bool> {
        self.inner.drain_tx.subscribe()
    }

    /// Point-in-time gauges appended to `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        let gw = &self.inner.gateway;
        vec![
            ("telemux_buffer_depth", gw.buffer().len() as u64),
            ("telemux_connections_registered", gw.registry().len() as u64),
            ("telemux_devices_registered", gw.registry().device_count() as u64),
        ]
    }
}

fn build_registrar(cfg: &GatewayConfig) -> Result<Arc<dyn DeviceRegistrar>> {
    let reg = &cfg.registration;
    match reg.mode {
        RegistrationMode::Local => Ok(Arc::new(LocalRegistrar::new(reg.id_prefix.clone()))),
        RegistrationMode::Http => {
            let url = reg
                .api_url
                .as_deref()
                .ok_or_else(|| GatewayError::BadConfig("registration.api_url is required for http mode".into()))?;
            Ok(Arc::new(HttpRegistrar::new(url, Duration::from_millis(reg.timeout_ms))?))
        }
    }
}

fn build_store(cfg: &GatewayConfig) -> Result<Arc<dyn FrameStore>> {
    let st = &cfg.store;
    match st.mode {
        StoreMode::Memory => Ok(Arc::new(MemoryFrameStore::new())),
        StoreMode::Http => {
            let url = st
                .url
                .as_deref()
                .ok_or_else(|| GatewayError::BadConfig("store.url is required for http mode".into()))?;
            Ok(Arc::new(HttpFrameStore::new(url, Duration::from_millis(st.timeout_ms))?))
        }
    }
}
