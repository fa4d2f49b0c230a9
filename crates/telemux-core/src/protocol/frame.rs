//! Raw CAN frame as relayed by the vehicle controller.

use serde::{Deserialize, Serialize};

/// Discriminator carried by raw frame messages (`"type": "canFrame"`).
pub const CAN_FRAME_TYPE: &str = "canFrame";

/// A single CAN-bus message as received.
///
/// `length_code` is the declared DLC and may differ from `payload.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Frame identifier (11-bit standard or 29-bit extended).
    pub id: u32,
    /// Payload bytes, typically 8.
    #[serde(rename = "data")]
    pub payload: Vec<u8>,
    /// Declared data length code.
    #[serde(rename = "dlc")]
    pub length_code: u8,
    /// Extended / remote flag, carried opaquely.
    #[serde(default)]
    pub extended: bool,
}

impl RawFrame {
    pub fn new(id: u32, payload: Vec<u8>) -> Self {
        let length_code = u8::try_from(payload.len()).unwrap_or(u8::MAX);
        Self {
            id,
            payload,
            length_code,
            extended: false,
        }
    }
}

/// Wire shape of an inbound `canFrame` message.
///
/// `type` is checked by the classifier; `dlc` falls back to the payload length.
#[derive(Debug, Deserialize)]
pub(crate) struct WireFrame {
    pub id: u32,
    pub data: Vec<u8>,
    #[serde(default)]
    pub dlc: Option<u8>,
    #[serde(default)]
    pub extended: bool,
}

impl From<WireFrame> for RawFrame {
    fn from(w: WireFrame) -> Self {
        let length_code = w
            .dlc
            .unwrap_or_else(|| u8::try_from(w.data.len()).unwrap_or(u8::MAX));
        RawFrame {
            id: w.id,
            payload: w.data,
            length_code,
            extended: w.extended,
        }
    }
}
