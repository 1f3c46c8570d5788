//! Top-level facade crate for ssecast.
//!
//! Re-exports the wire primitives and the broker/gateway library so users can
//! depend on a single crate.

pub mod core {
    pub use ssecast_core::*;
}

pub mod gateway {
    pub use ssecast_gateway::*;
}
