//! HTTP transport: the event-stream endpoints and the thin publish/membership API.

pub mod api;
pub mod error;
pub mod sse;

pub use error::ApiError;
