//! Gateway: owns the shared registry, buffer and router, and applies the
//! per-message pipeline for every connection.
//!
//! Frames flow `classify -> identity check -> raw echo -> decode -> decoded
//! broadcast -> enqueue`. The origin connection never receives its own echo.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use telemux_core::decoder::{DecodedReading, DecoderRegistry};
use telemux_core::error::Result;
use telemux_core::protocol::frame::RawFrame;
use telemux_core::protocol::inbound::Inbound;

use crate::collab::{DeviceRegistrar, FrameStore};
use crate::config::GatewayConfig;
use crate::ingest::{EnqueueOutcome, FrameBuffer};
use crate::obs::GatewayMetrics;
use crate::realtime::core::{BroadcastRouter, ConnId, ConnectionRegistry, Identity};
use crate::realtime::identity::{HandshakeOutcome, IdentityProtocol};
use crate::realtime::types::{device_disconnected_json, welcome_json, RawEcho};

/// Why a frame was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Unidentified,
    /// Handshake sent, registration still in flight.
    Registering,
    Gone,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::Unidentified => "unidentified",
            DropReason::Registering => "registering",
            DropReason::Gone => "gone",
        }
    }
}

#[derive(Debug)]
pub enum FrameOutcome {
    Accepted {
        /// Registered kind for the frame id; `None` for unknown ids.
        kind: Option<&'static str>,
        decoded: Result<DecodedReading>,
        enqueue: EnqueueOutcome,
    },
    Dropped(DropReason),
}

#[derive(Debug)]
pub enum Dispatch {
    Handshake(JoinHandle<HandshakeOutcome>),
    Frame(FrameOutcome),
    Discarded,
}

pub struct Gateway {
    registry: Arc<ConnectionRegistry>,
    router: Arc<BroadcastRouter>,
    identity: Arc<IdentityProtocol>,
    decoders: DecoderRegistry,
    buffer: Arc<FrameBuffer>,
    metrics: Arc<GatewayMetrics>,
    sentinel: String,
}

impl Gateway {
    pub fn new(
        cfg: &GatewayConfig,
        decoders: DecoderRegistry,
        registrar: Arc<dyn DeviceRegistrar>,
        store: Arc<dyn FrameStore>,
        metrics: Arc<GatewayMetrics>,
    ) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(BroadcastRouter::new(Arc::clone(&registry), Arc::clone(&metrics)));
        let identity = Arc::new(IdentityProtocol::new(
            Arc::clone(&registry),
            registrar,
            Arc::clone(&router),
            Arc::clone(&metrics),
        ));
        let buffer = Arc::new(FrameBuffer::new(cfg.buffer.clone(), store, Arc::clone(&metrics)));

        Arc::new(Self {
            registry,
            router,
            identity,
            decoders,
            buffer,
            metrics,
            sentinel: cfg.gateway.handshake_sentinel.clone(),
        })
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn buffer(&self) -> &Arc<FrameBuffer> {
        &self.buffer
    }

    pub fn identity(&self) -> &Arc<IdentityProtocol> {
        &self.identity
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Register a new connection and queue its welcome message.
    pub fn open(&self, tx: mpsc::Sender<Message>) -> ConnId {
        let conn = self.registry.insert(tx);
        self.metrics.connections_active.inc(&[]);
        if let Err(e) = self.router.send_to(conn, &welcome_json(conn)) {
            tracing::warn!(%conn, error = %e, "welcome not sent");
        }
        tracing::debug!(%conn, "connection opened");
        conn
    }

    pub fn handle_inbound(self: &Arc<Self>, conn: ConnId, msg: Inbound) -> Dispatch {
        if msg.is_structured() {
            self.registry.mark_structured(conn);
        }
        match msg {
            Inbound::Handshake => Dispatch::Handshake(self.identity.spawn_handshake(conn)),
            Inbound::Frame(frame) => Dispatch::Frame(self.accept_frame(conn, frame)),
            Inbound::Unrecognized { structured, reason } => {
                let label = if structured { "unsupported" } else { "unparsed" };
                self.discard(conn, label, &reason);
                Dispatch::Discarded
            }
        }
    }

    /// Log-and-discard for messages that never reach the pipeline.
    pub fn discard(&self, conn: ConnId, label: &'static str, reason: &str) {
        self.metrics.messages_discarded.inc(&[("reason", label)]);
        tracing::debug!(%conn, reason, "message discarded");
    }

    pub fn accept_frame(self: &Arc<Self>, conn: ConnId, frame: RawFrame) -> FrameOutcome {
        let device_id = match self.registry.identity(conn) {
            Some(Identity::Device(id)) => id,
            Some(Identity::Registering) => return self.drop_frame(conn, &frame, DropReason::Registering),
            Some(Identity::Unidentified) => return self.drop_frame(conn, &frame, DropReason::Unidentified),
            None => return self.drop_frame(conn, &frame, DropReason::Gone),
        };

        if let Err(e) = self.router.broadcast(Some(conn), &RawEcho::new(&device_id, &frame)) {
            tracing::warn!(%conn, error = %e, "raw echo not sent");
        }

        let kind = self.decoders.kind_of(frame.id);
        let decoded = self.decoders.decode(&frame);
        match &decoded {
            Ok(reading) if reading.is_known() => {
                if let Err(e) = self.router.broadcast(Some(conn), reading) {
                    tracing::warn!(%conn, error = %e, "decoded reading not sent");
                }
            }
            Ok(_) => {
                tracing::trace!(%conn, frame_id = frame.id, "unknown frame id");
            }
            Err(e) => {
                self.metrics
                    .decode_failures
                    .inc(&[("kind", kind.unwrap_or("unknown")), ("code", e.code().as_str())]);
                tracing::warn!(%conn, device_id = %device_id, frame_id = frame.id, error = %e, "frame decode failed");
            }
        }

        self.metrics.frames_accepted.inc(&[("kind", kind.unwrap_or("unknown"))]);

        let enqueue = self.buffer.enqueue(device_id, frame);
        if enqueue.flush_due() {
            self.buffer.spawn_flush();
        }

        FrameOutcome::Accepted { kind, decoded, enqueue }
    }

    fn drop_frame(&self, conn: ConnId, frame: &RawFrame, reason: DropReason) -> FrameOutcome {
        self.metrics.frames_dropped.inc(&[("reason", reason.as_str())]);
        tracing::info!(%conn, frame_id = frame.id, reason = reason.as_str(), "frame from non-device dropped");
        FrameOutcome::Dropped(reason)
    }

    /// Remove the connection; a departing device is announced to the rest.
    pub fn close(&self, conn: ConnId) {
        let Some(departed) = self.registry.remove(conn) else {
            return;
        };
        self.metrics.connections_active.dec(&[]);

        if let Identity::Device(id) = &departed.identity {
            self.metrics.devices_active.dec(&[]);
            tracing::info!(%conn, device_id = %id, "device disconnected");
            if let Err(e) = self.router.broadcast(None, &device_disconnected_json(id)) {
                tracing::warn!(%conn, error = %e, "disconnect notice not sent");
            }
        } else {
            tracing::debug!(%conn, role = departed.role.as_str(), "connection closed");
        }
    }
}
