//! Event-stream framing vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use ssecast_core::error::SseCastError;
use ssecast_core::protocol::{keep_alive, FramedMessage};

fn encoded(msg: &FramedMessage) -> String {
    String::from_utf8(msg.encode().unwrap().to_vec()).unwrap()
}

#[test]
fn full_message() {
    let msg = FramedMessage::new("bar").with_event("foo").with_id("1");
    assert_eq!(encoded(&msg), "event: foo\nid: 1\ndata: bar\n\n");
}

#[test]
fn data_only() {
    assert_eq!(encoded(&FramedMessage::new("bar")), "data: bar\n\n");
}

#[test]
fn id_without_event() {
    let msg = FramedMessage::new("x").with_id("42");
    assert_eq!(encoded(&msg), "id: 42\ndata: x\n\n");
}

#[test]
fn multiline_data_splits_into_data_lines() {
    let msg = FramedMessage::new("line one\r\nline two\nline three");
    assert_eq!(
        encoded(&msg),
        "data: line one\ndata: line two\ndata: line three\n\n"
    );
}

#[test]
fn bare_carriage_return_cannot_inject_fields() {
    let msg = FramedMessage::new("x\rid: evil\revent: spoof");
    assert_eq!(
        encoded(&msg),
        "data: x\ndata: id: evil\ndata: event: spoof\n\n"
    );
}

#[test]
fn mixed_terminators_keep_blank_lines() {
    let msg = FramedMessage::new("a\r\rb\n\r\nc\n");
    assert_eq!(
        encoded(&msg),
        "data: a\ndata: \ndata: b\ndata: \ndata: c\ndata: \n\n"
    );
}

#[test]
fn empty_data_still_terminates_block() {
    assert_eq!(encoded(&FramedMessage::new("")), "data: \n\n");
}

#[test]
fn newline_in_event_name_is_rejected() {
    let msg = FramedMessage::new("x").with_event("a\nb");
    let err = msg.encode().unwrap_err();
    assert!(matches!(err, SseCastError::FormattingFailure(_)));
    assert_eq!(err.client_code().as_str(), "UNPROCESSABLE");
}

#[test]
fn carriage_return_in_id_is_rejected() {
    let msg = FramedMessage::new("x").with_id("7\r");
    assert!(matches!(
        msg.encode(),
        Err(SseCastError::FormattingFailure(_))
    ));
}

#[test]
fn json_payload() {
    let msg = FramedMessage::from_json(&serde_json::json!({"n": 1})).unwrap();
    assert_eq!(encoded(&msg), "data: {\"n\":1}\n\n");
}

#[test]
fn keep_alive_is_a_comment_block() {
    assert_eq!(&keep_alive()[..], b": keep-alive\n\n");
}
