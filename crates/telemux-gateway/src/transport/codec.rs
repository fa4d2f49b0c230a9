//! Decode-once codec for the transport layer.
//!
//! - Text frames are classified against the handshake sentinel.
//! - Binary frames are classified the same way when they are valid UTF-8.
//! - Ping/Pong/Close are surfaced for lifecycle management.

use axum::extract::ws::Message;

use telemux_core::protocol::inbound::{classify, Inbound};

#[derive(Debug)]
pub enum Decoded {
    App(Inbound),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

pub fn decode(msg: Message, sentinel: &str) -> Decoded {
    match msg {
        Message::Text(s) => Decoded::App(classify(&s, sentinel)),
        Message::Binary(b) => match std::str::from_utf8(&b) {
            Ok(s) => Decoded::App(classify(s, sentinel)),
            Err(e) => Decoded::App(Inbound::Unrecognized {
                structured: false,
                reason: format!("binary message is not utf-8: {e}"),
            }),
        },
        Message::Ping(v) => Decoded::Ping(v),
        Message::Pong(v) => Decoded::Pong(v),
        Message::Close(_) => Decoded::Close,
    }
}

/// Cheap length check before any parsing.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}
