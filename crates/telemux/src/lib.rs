//! Top-level facade crate for telemux.
//!
//! Re-exports the protocol/decoder core and the gateway library so users can
//! depend on a single crate.

pub mod core {
    pub use telemux_core::*;
}

pub mod gateway {
    pub use telemux_gateway::*;
}
