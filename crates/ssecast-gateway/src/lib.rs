//! ssecast gateway library entry.
//!
//! Event broker, stream loops, config, and the axum wiring that exposes them
//! as a Server-Sent Events service. Consumed by the binary (`main.rs`) and by
//! integration tests.

pub mod app_state;
pub mod broker;
pub mod config;
pub mod notice;
pub mod router;
pub mod stream;
pub mod transport;
