//! External collaborators consumed by the gateway.
//!
//! - `registration`: allocates device ids on handshake.
//! - `store`: durable batch persistence of raw frames.

pub mod registration;
pub mod store;

pub use registration::{DeviceRegistrar, HttpRegistrar, LocalRegistrar, RegistrationSeed};
pub use store::{FrameRecord, FrameStore, HttpFrameStore, MemoryFrameStore};
