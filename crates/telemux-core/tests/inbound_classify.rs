//! Inbound classification tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use telemux_core::protocol::frame::RawFrame;
use telemux_core::protocol::inbound::{classify, Inbound, DEFAULT_HANDSHAKE_SENTINEL};

fn frame_of(inb: Inbound) -> RawFrame {
    match inb {
        Inbound::Frame(f) => f,
        other => panic!("expected frame, got {other:?}"),
    }
}

#[test]
fn sentinel_is_exact_and_case_sensitive() {
    assert_eq!(classify(DEFAULT_HANDSHAKE_SENTINEL, DEFAULT_HANDSHAKE_SENTINEL), Inbound::Handshake);

    let lower = DEFAULT_HANDSHAKE_SENTINEL.to_lowercase();
    assert!(matches!(classify(&lower, DEFAULT_HANDSHAKE_SENTINEL), Inbound::Unrecognized { structured: false, .. }));

    let padded = format!(" {DEFAULT_HANDSHAKE_SENTINEL}");
    assert!(matches!(classify(&padded, DEFAULT_HANDSHAKE_SENTINEL), Inbound::Unrecognized { .. }));
}

#[test]
fn full_frame_message() {
    let msg = r#"{"type":"canFrame","id":288,"data":[21,224,0,25,28,0,85,92],"dlc":8,"extended":false}"#;
    let f = frame_of(classify(msg, DEFAULT_HANDSHAKE_SENTINEL));
    assert_eq!(f.id, 0x120);
    assert_eq!(f.payload, vec![21, 224, 0, 25, 28, 0, 85, 92]);
    assert_eq!(f.length_code, 8);
    assert!(!f.extended);
}

#[test]
fn dlc_defaults_to_payload_len_and_may_differ() {
    let f = frame_of(classify(r#"{"type":"canFrame","id":1,"data":[1,2,3]}"#, DEFAULT_HANDSHAKE_SENTINEL));
    assert_eq!(f.length_code, 3);

    let f = frame_of(classify(r#"{"type":"canFrame","id":1,"data":[1,2,3],"dlc":8,"extended":true}"#, DEFAULT_HANDSHAKE_SENTINEL));
    assert_eq!(f.length_code, 8);
    assert!(f.extended);
}

#[test]
fn malformed_frames_are_unrecognized_but_structured() {
    let cases = [
        r#"{"type":"canFrame","data":[1,2,3]}"#,
        r#"{"type":"canFrame","id":288,"data":"AABB"}"#,
        r#"{"type":"canFrame","id":288,"data":[1,256]}"#,
        r#"{"type":"canFrame","id":-1,"data":[1]}"#,
        r#"{"type":"canFrame","id":"0x120","data":[1]}"#,
    ];
    for c in cases {
        match classify(c, DEFAULT_HANDSHAKE_SENTINEL) {
            Inbound::Unrecognized { structured, reason } => {
                assert!(structured, "case={c}");
                assert!(reason.contains("canFrame"), "case={c} reason={reason}");
            }
            other => panic!("case={c} got {other:?}"),
        }
    }
}

#[test]
fn other_shapes_are_unrecognized() {
    let structured = [r#"{"message":"hello"}"#, r#"{"type":"ping"}"#];
    for c in structured {
        let inb = classify(c, DEFAULT_HANDSHAKE_SENTINEL);
        assert!(matches!(inb, Inbound::Unrecognized { structured: true, .. }), "case={c}");
        assert!(inb.is_structured());
    }

    let unstructured = ["hello", "[1,2,3]", "42", "{not json"];
    for c in unstructured {
        let inb = classify(c, DEFAULT_HANDSHAKE_SENTINEL);
        assert!(matches!(inb, Inbound::Unrecognized { structured: false, .. }), "case={c}");
    }
}

#[test]
fn custom_sentinel() {
    assert_eq!(classify("hello gateway", "hello gateway"), Inbound::Handshake);
    assert!(!matches!(classify(DEFAULT_HANDSHAKE_SENTINEL, "hello gateway"), Inbound::Handshake));
}
