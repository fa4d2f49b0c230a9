//! telemux core: wire contracts, the CAN frame decoder, and the error surface.
//!
//! This crate defines the inbound message classification, the raw frame model
//! and the decoder registry shared by the gateway and its tests. It carries no
//! transport or runtime dependencies so decoding can be reused offline.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `GatewayError`/`Result` so a hostile or buggy device cannot take
//! the gateway down with a bad frame.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod decoder;
pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{GatewayError, Result};
