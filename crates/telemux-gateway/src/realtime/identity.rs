//! Device identity assignment.
//!
//! A handshake moves a connection `Unidentified -> Registering`, asks the
//! registrar for an id off the session task, then commits `Device(id)` only if
//! the connection is still registering. A failed registrar call reverts to
//! `Unidentified`, so a later handshake may retry.

use std::sync::Arc;

use tokio::task::JoinHandle;

use telemux_core::error::GatewayError;

use crate::collab::{DeviceRegistrar, RegistrationSeed};
use crate::obs::GatewayMetrics;
use crate::realtime::core::{BeginRegistration, BroadcastRouter, ConnId, ConnectionRegistry, Identity};
use crate::realtime::types::device_connected_json;

#[derive(Debug)]
pub enum HandshakeOutcome {
    Assigned(Arc<str>),
    /// Already registering or registered; identity unchanged.
    Ignored(Identity),
    /// Registrar failed; connection is back to `Unidentified`.
    Failed(GatewayError),
    /// Connection closed before the id could be committed.
    Gone,
}

pub struct IdentityProtocol {
    registry: Arc<ConnectionRegistry>,
    registrar: Arc<dyn DeviceRegistrar>,
    router: Arc<BroadcastRouter>,
    metrics: Arc<GatewayMetrics>,
}

impl IdentityProtocol {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        registrar: Arc<dyn DeviceRegistrar>,
        router: Arc<BroadcastRouter>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            registry,
            registrar,
            router,
            metrics,
        }
    }

    pub async fn assign(&self, conn: ConnId) -> HandshakeOutcome {
        match self.registry.begin_registration(conn) {
            BeginRegistration::Started => {}
            BeginRegistration::Busy(current) => {
                self.metrics.registrations.inc(&[("outcome", "ignored")]);
                tracing::debug!(%conn, ?current, "handshake ignored");
                return HandshakeOutcome::Ignored(current);
            }
            BeginRegistration::Gone => return HandshakeOutcome::Gone,
        }

        let device_id: Arc<str> = match self.registrar.register(RegistrationSeed::default()).await {
            Ok(id) => Arc::from(id),
            Err(e) => {
                self.registry.abort_registration(conn);
                self.metrics.registrations.inc(&[("outcome", "error")]);
                tracing::warn!(%conn, error = %e, code = e.code().as_str(), "device registration failed");
                return HandshakeOutcome::Failed(e);
            }
        };

        if !self.registry.complete_registration(conn, Arc::clone(&device_id)) {
            tracing::info!(%conn, device_id = %device_id, "connection closed during registration, id discarded");
            return HandshakeOutcome::Gone;
        }

        self.metrics.registrations.inc(&[("outcome", "ok")]);
        self.metrics.devices_active.inc(&[]);
        tracing::info!(%conn, device_id = %device_id, "device registered");

        if let Err(e) = self.router.broadcast(Some(conn), &device_connected_json(&device_id)) {
            tracing::warn!(%conn, error = %e, "connect notice not sent");
        }

        HandshakeOutcome::Assigned(device_id)
    }

    /// Run [`assign`](Self::assign) off the caller's task.
    pub fn spawn_handshake(self: &Arc<Self>, conn: ConnId) -> JoinHandle<HandshakeOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.assign(conn).await })
    }
}
