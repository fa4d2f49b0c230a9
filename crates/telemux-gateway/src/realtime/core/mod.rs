//! Realtime core components for the gateway runtime.
//!
//! Connection registry (identity per connection) and the broadcast router that
//! fans payloads out to everyone but the sender.

mod broadcast;
mod registry;

pub use broadcast::{BroadcastReport, BroadcastRouter};
pub use registry::{BeginRegistration, ConnId, ConnectionRegistry, Departed, Identity, Role};
