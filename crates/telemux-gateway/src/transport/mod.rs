//! Transport layer (WebSocket).
//!
//! Exposes the WS upgrade handler and the codec that classifies each message
//! once before it reaches the gateway pipeline.

pub mod codec;
pub mod ws;
