//! Inbound message classification.
//!
//! Every text message from a connection is classified exactly once into a closed
//! set before any further processing:
//! - `Handshake`: exact, case-sensitive match with the device sentinel.
//! - `Frame`: a JSON object tagged `"type": "canFrame"` with a valid frame shape.
//! - `Unrecognized`: anything else (never an error for the connection).

use serde_json::Value;

use crate::protocol::frame::{RawFrame, WireFrame, CAN_FRAME_TYPE};

/// Default handshake sentinel sent by the vehicle controller after connecting.
pub const DEFAULT_HANDSHAKE_SENTINEL: &str = "ESP32 Connected to WebSocket!";

/// Classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Handshake,
    Frame(RawFrame),
    Unrecognized {
        /// True when the message was a JSON object (the sender is talking the
        /// structured protocol, e.g. a dashboard).
        structured: bool,
        reason: String,
    },
}

impl Inbound {
    pub fn is_structured(&self) -> bool {
        match self {
            Inbound::Handshake => false,
            Inbound::Frame(_) => true,
            Inbound::Unrecognized { structured, .. } => *structured,
        }
    }
}

/// Classify one text message.
pub fn classify(text: &str, sentinel: &str) -> Inbound {
    if text == sentinel {
        return Inbound::Handshake;
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            return Inbound::Unrecognized {
                structured: false,
                reason: format!("not json: {e}"),
            }
        }
    };

    let Some(obj) = value.as_object() else {
        return Inbound::Unrecognized {
            structured: false,
            reason: "json is not an object".into(),
        };
    };

    match obj.get("type").and_then(Value::as_str) {
        Some(CAN_FRAME_TYPE) => {}
        Some(other) => {
            return Inbound::Unrecognized {
                structured: true,
                reason: format!("unsupported message type: {other}"),
            }
        }
        None => {
            return Inbound::Unrecognized {
                structured: true,
                reason: "missing message type".into(),
            }
        }
    }

    match serde_json::from_value::<WireFrame>(value) {
        Ok(w) => Inbound::Frame(w.into()),
        Err(e) => Inbound::Unrecognized {
            structured: true,
            reason: format!("malformed canFrame: {e}"),
        },
    }
}
