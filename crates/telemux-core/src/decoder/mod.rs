//! CAN frame decoder.
//!
//! Decoding is a pure function of `(id, payload)`. Known ids map to a
//! [`FrameDecoder`] in an open registry; anything else decodes to
//! [`DecodedReading::Unknown`], which is not an error. Adding a frame kind means
//! registering one more decoder, never touching call sites.

mod kinds;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{GatewayError, Result};
use crate::protocol::frame::RawFrame;

pub use kinds::{
    BatteryDecoder, BatteryReading, MotorControllerDecoder, MotorReading, BATTERY_FRAME_ID,
    MOTOR_FRAME_ID,
};

/// Semantic reading produced from a raw frame.
///
/// Serializes as the decoded broadcast message:
/// `{"type": <kind>, "decoded": {...}}`. Decoders outside this crate report
/// their readings through [`DecodedReading::Other`] and travel the same path.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedReading {
    Battery(BatteryReading),
    MotorController(MotorReading),
    Other {
        kind: &'static str,
        decoded: Value,
    },
    Unknown,
}

impl DecodedReading {
    /// Reading for a registered kind with an arbitrary serializable body.
    pub fn other<T: Serialize>(kind: &'static str, body: &T) -> Result<Self> {
        let decoded = serde_json::to_value(body)
            .map_err(|e| GatewayError::Internal(format!("{kind} reading encode failed: {e}")))?;
        Ok(DecodedReading::Other { kind, decoded })
    }

    /// Wire tag of a known reading; `None` for `Unknown`.
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            DecodedReading::Battery(_) => Some("battery"),
            DecodedReading::MotorController(_) => Some("motorController"),
            DecodedReading::Other { kind, .. } => Some(*kind),
            DecodedReading::Unknown => None,
        }
    }

    pub fn is_known(&self) -> bool {
        self.kind().is_some()
    }
}

impl Serialize for DecodedReading {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let Some(kind) = self.kind() else {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry("type", "unknown")?;
            return map.end();
        };

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", kind)?;
        match self {
            DecodedReading::Battery(r) => map.serialize_entry("decoded", r)?,
            DecodedReading::MotorController(r) => map.serialize_entry("decoded", r)?,
            DecodedReading::Other { decoded, .. } => map.serialize_entry("decoded", decoded)?,
            DecodedReading::Unknown => {}
        }
        map.end()
    }
}

/// Decode rule for one frame id.
pub trait FrameDecoder: Send + Sync {
    fn frame_id(&self) -> u32;
    /// Short name used in logs and metric labels.
    fn kind(&self) -> &'static str;
    fn decode(&self, payload: &[u8]) -> Result<DecodedReading>;
}

/// Registry of decoders keyed by frame id. Read-only once shared.
#[derive(Default, Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<u32, Arc<dyn FrameDecoder>>,
}

impl DecoderRegistry {
    /// Empty registry: every frame decodes to `Unknown`.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Registry with the battery and motor-controller decoders.
    pub fn with_builtin() -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(BatteryDecoder));
        reg.register(Arc::new(MotorControllerDecoder));
        reg
    }

    /// Register a decoder. Returns the one it replaced, if any.
    pub fn register(&mut self, decoder: Arc<dyn FrameDecoder>) -> Option<Arc<dyn FrameDecoder>> {
        let id = decoder.frame_id();
        let prev = self.decoders.insert(id, decoder);
        if let Some(p) = &prev {
            tracing::warn!(frame_id = id, replaced = p.kind(), "frame decoder replaced");
        }
        prev
    }

    pub fn registered_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.decoders.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Kind name for a frame id, if registered.
    pub fn kind_of(&self, id: u32) -> Option<&'static str> {
        self.decoders.get(&id).map(|d| d.kind())
    }

    pub fn decode(&self, frame: &RawFrame) -> Result<DecodedReading> {
        match self.decoders.get(&frame.id) {
            Some(d) => d.decode(&frame.payload),
            None => Ok(DecodedReading::Unknown),
        }
    }
}

/// Decode with the built-in registry.
pub fn decode(frame: &RawFrame) -> Result<DecodedReading> {
    static BUILTIN: OnceLock<DecoderRegistry> = OnceLock::new();
    BUILTIN.get_or_init(DecoderRegistry::with_builtin).decode(frame)
}
