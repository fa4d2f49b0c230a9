//! Realtime runtime: connection identity, fan-out, and the per-message pipeline.

pub mod core;
pub mod gateway;
pub mod identity;
pub mod types;

pub use core::{BroadcastReport, BroadcastRouter, ConnId, ConnectionRegistry, Identity, Role};
pub use gateway::{Dispatch, DropReason, FrameOutcome, Gateway};
pub use identity::{HandshakeOutcome, IdentityProtocol};
pub use types::PreparedMsg;
