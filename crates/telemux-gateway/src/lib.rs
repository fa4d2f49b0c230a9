//! telemux gateway library entry.
//!
//! Wires the WebSocket transport, the connection registry and identity
//! protocol, the broadcast router, and the frame buffer into one gateway. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod collab;
pub mod config;
pub mod ingest;
pub mod obs;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod transport;
