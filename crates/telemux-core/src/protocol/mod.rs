//! Wire protocol modules.
//!
//! - `frame`: the raw CAN frame model and its JSON shape.
//! - `inbound`: decode-once classification of connection messages.
//!
//! Classification never fails: malformed input becomes `Inbound::Unrecognized`
//! so a noisy client cannot close its own connection or crash the gateway.

pub mod frame;
pub mod inbound;
