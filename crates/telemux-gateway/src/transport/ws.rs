//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS (refused while draining)
//! - Register the connection with the gateway and pump its outbound queue
//! - Lifecycle: ping + idle timeout, drain-triggered close
//! - Size check first, then decode once and hand off to the gateway pipeline

use std::sync::Arc;

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::Instrument;

use crate::app_state::AppState;
use crate::realtime::{ConnId, Gateway};
use crate::transport::codec::{decode, frame_len, Decoded};

/// What the session loop does after one inbound message.
#[derive(Debug)]
pub enum Step {
    Continue,
    Reply(Message),
    Close,
}

/// Size check first, then decode once and hand off to the gateway pipeline.
/// Nothing here closes the connection except a client `Close`.
pub fn process_message(gateway: &Arc<Gateway>, conn: ConnId, msg: Message, max_bytes: usize) -> Step {
    let len = frame_len(&msg);
    if len > max_bytes {
        gateway.discard(conn, "oversize", &format!("{len} bytes exceeds {max_bytes}"));
        return Step::Continue;
    }

    match decode(msg, gateway.sentinel()) {
        Decoded::App(inbound) => {
            // handshake tasks finish on their own
            let _ = gateway.handle_inbound(conn, inbound);
            Step::Continue
        }
        Decoded::Ping(payload) => Step::Reply(Message::Pong(payload)),
        Decoded::Pong(_) => Step::Continue,
        Decoded::Close => Step::Close,
    }
}

// --------------------
// Entry
// --------------------
pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if app.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response();
    }
    app.metrics().ws_upgrades.inc(&[]);
    ws.on_upgrade(move |socket| run_session(app, socket))
}

// --------------------
// Core session loop
// --------------------
async fn run_session(app: AppState, socket: WebSocket) {
    let gateway = app.gateway();
    let gw = app.cfg().gateway.clone();

    // ---- outbound channel; the registry keeps a clone for broadcasts
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(gw.outbound_queue);
    let conn = gateway.open(out_tx.clone());

    let span = tracing::info_span!("ws_session", %conn);
    async move {
        let (mut ws_tx, mut ws_rx) = socket.split();

        let ping_every = Duration::from_millis(gw.ping_interval_ms);
        let idle_timeout = Duration::from_millis(gw.idle_timeout_ms);
        let mut ping_tick = tokio::time::interval_at(Instant::now() + ping_every, ping_every);
        ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut drain = app.subscribe_drain();
        let mut last_activity = Instant::now();

        loop {
            tokio::select! {
                // outbound writer
                maybe_out = out_rx.recv() => {
                    let Some(m) = maybe_out else { break; };
                    if ws_tx.send(m).await.is_err() {
                        break;
                    }
                }

                // inbound reader
                incoming = ws_rx.next() => {
                    let Some(Ok(msg)) = incoming else { break; };
                    last_activity = Instant::now();

                    match process_message(&gateway, conn, msg, gw.max_message_bytes) {
                        Step::Continue => {}
                        Step::Reply(m) => {
                            let _ = out_tx.try_send(m);
                        }
                        Step::Close => break,
                    }
                }

                _ = ping_tick.tick() => {
                    let _ = out_tx.try_send(Message::Ping(Vec::new()));
                }

                _ = tokio::time::sleep_until(last_activity + idle_timeout) => {
                    tracing::info!("idle timeout");
                    break;
                }

                changed = drain.changed() => {
                    if changed.is_err() || *drain.borrow() {
                        tracing::debug!("closing for shutdown");
                        break;
                    }
                }
            }
        }

        let _ = ws_tx.send(Message::Close(None)).await;
        gateway.close(conn);
    }
    .instrument(span)
    .await
}
