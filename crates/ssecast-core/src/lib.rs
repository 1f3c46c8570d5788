//! ssecast core: transport-agnostic wire framing and the shared error type.
//!
//! This crate defines the Server-Sent Events frame format and the error
//! surface shared by the broker, the stream handlers and the HTTP wiring. It
//! carries no runtime or transport dependencies so it can be reused by
//! producers that only need to build frames.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `SseCastError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, SseCastError};
