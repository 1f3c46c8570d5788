#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use tokio::time::Duration;

use ssecast_gateway::broker::SendPolicy;
use ssecast_gateway::config;

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.listen, "0.0.0.0:8080");
    assert_eq!(cfg.gateway.keep_alive(), Some(Duration::from_millis(15000)));
    assert_eq!(cfg.broker.channel_capacity, 64);
    assert_eq!(cfg.broker.send_policy, SendPolicy::Timeout { timeout_ms: 1500 });
    assert_eq!(cfg.streamer.channel_capacity, 100);
}

#[test]
fn full_config() {
    let ok = r#"
version: 1
gateway:
  listen: "127.0.0.1:9000"
  keep_alive_ms: 0
broker:
  channel_capacity: 8
  send_policy: { mode: discard }
streamer:
  channel_capacity: 4
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.gateway.keep_alive(), None);
    assert_eq!(cfg.broker.channel_capacity, 8);
    assert_eq!(cfg.broker.send_policy, SendPolicy::Discard);
    assert_eq!(cfg.streamer.channel_capacity, 4);
}

#[test]
fn block_policy_parses() {
    let cfg = config::load_from_str("version: 1\nbroker:\n  send_policy:\n    mode: block\n").unwrap();
    assert_eq!(cfg.broker.send_policy, SendPolicy::Block);
}

#[test]
fn drop_is_accepted_for_discard() {
    for mode in ["discard", "drop"] {
        let yaml = format!("version: 1\nbroker:\n  send_policy: {{ mode: {mode} }}\n");
        let cfg = config::load_from_str(&yaml).unwrap();
        assert_eq!(cfg.broker.send_policy, SendPolicy::Discard, "mode {mode}");
    }
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
broker:
  channel_capacty: 8 # typo should fail
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn unknown_policy_mode_is_rejected() {
    let bad = "version: 1\nbroker:\n  send_policy: { mode: drop_oldest }\n";
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn out_of_range_values_are_rejected() {
    for bad in [
        "version: 1\nbroker:\n  channel_capacity: 0\n",
        "version: 1\nbroker:\n  send_policy: { mode: timeout, timeout_ms: 0 }\n",
        "version: 1\ngateway:\n  keep_alive_ms: 10\n",
        "version: 1\nstreamer:\n  channel_capacity: 100000\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST", "{bad}");
    }
}
