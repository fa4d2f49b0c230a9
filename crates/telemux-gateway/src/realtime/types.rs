//! Outbound message shapes: prepared text, raw frame echo, and notices.

use axum::extract::ws::Message;
use serde::Serialize;
use serde_json::json;

use telemux_core::error::{GatewayError, Result};
use telemux_core::protocol::frame::{RawFrame, CAN_FRAME_TYPE};

use crate::realtime::core::ConnId;

/// Message serialized once and cloned per recipient.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedMsg {
    Text(String),
}

impl PreparedMsg {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let s = serde_json::to_string(value)
            .map_err(|e| GatewayError::Internal(format!("json encode failed: {e}")))?;
        Ok(PreparedMsg::Text(s))
    }

    pub fn to_ws_message(&self) -> Message {
        match self {
            PreparedMsg::Text(s) => Message::Text(s.clone()),
        }
    }
}

/// Raw frame echo: the inbound frame tagged with its originating device.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEcho<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub device_id: &'a str,
    #[serde(flatten)]
    pub frame: &'a RawFrame,
}

impl<'a> RawEcho<'a> {
    pub fn new(device_id: &'a str, frame: &'a RawFrame) -> Self {
        Self {
            kind: CAN_FRAME_TYPE,
            device_id,
            frame,
        }
    }
}

// --------------------
// Notices
// --------------------
pub fn welcome_json(conn: ConnId) -> serde_json::Value {
    json!({
        "type": "welcome",
        "message": "Connected to WebSocket server",
        "connection": conn.get(),
    })
}

pub fn device_connected_json(device_id: &str) -> serde_json::Value {
    json!({
        "type": "deviceConnected",
        "deviceId": device_id,
        "message": format!("device {device_id} connected"),
    })
}

pub fn device_disconnected_json(device_id: &str) -> serde_json::Value {
    json!({
        "type": "deviceDisconnected",
        "deviceId": device_id,
        "message": format!("device {device_id} disconnected"),
    })
}
