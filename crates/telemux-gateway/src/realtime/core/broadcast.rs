//! Fan-out of serialized payloads to every connection but the sender.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;

use telemux_core::error::{GatewayError, Result};

use crate::obs::GatewayMetrics;
use crate::realtime::core::{ConnId, ConnectionRegistry};
use crate::realtime::types::PreparedMsg;

/// Per-call delivery summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Recipient's writer already gone (socket closing).
    pub skipped_closed: usize,
    /// Recipient's outbound queue full.
    pub failed: usize,
}

/// Fan-out engine. Fire-and-forget: `try_send` only, no retry, no await.
pub struct BroadcastRouter {
    registry: Arc<ConnectionRegistry>,
    metrics: Arc<GatewayMetrics>,
}

impl BroadcastRouter {
    pub fn new(registry: Arc<ConnectionRegistry>, metrics: Arc<GatewayMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Send `payload` to every registered connection except `origin`.
    pub fn broadcast<T: Serialize + ?Sized>(&self, origin: Option<ConnId>, payload: &T) -> Result<BroadcastReport> {
        let prepared = PreparedMsg::json(payload)?;
        Ok(self.broadcast_prepared(origin, &prepared))
    }

    pub fn broadcast_prepared(&self, origin: Option<ConnId>, prepared: &PreparedMsg) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (conn, tx) in self.registry.recipients(origin) {
            if tx.is_closed() {
                report.skipped_closed += 1;
                continue;
            }
            match tx.try_send(prepared.to_ws_message()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.failed += 1;
                    self.metrics.broadcast_send_failures.inc(&[("reason", "queue_full")]);
                    tracing::warn!(%conn, "broadcast dropped: outbound queue full");
                }
                Err(TrySendError::Closed(_)) => {
                    report.skipped_closed += 1;
                }
            }
        }

        report
    }

    /// Direct send to one connection (acknowledgements).
    pub fn send_to<T: Serialize + ?Sized>(&self, conn: ConnId, payload: &T) -> Result<()> {
        let tx = self
            .registry
            .sender(conn)
            .ok_or_else(|| GatewayError::SendFailure(format!("connection {conn} not registered")))?;
        let prepared = PreparedMsg::json(payload)?;
        tx.try_send(prepared.to_ws_message())
            .map_err(|e| GatewayError::SendFailure(format!("connection {conn}: {e}")))
    }
}
