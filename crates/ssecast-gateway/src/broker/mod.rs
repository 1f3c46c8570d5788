//! Event broker: client registry, groups, fan-out.
//!
//! A single control task serializes every registry mutation; point sends go
//! straight to the target channel.

mod adapter;
mod control;
mod core;
mod groups;
mod policy;

pub use self::adapter::{DisplayAdapter, FnAdapter, JsonAdapter, MessageAdapter};
pub use self::control::Hook;
pub use self::core::{Broker, BrokerBuilder, ClientSession, Fanout, DEFAULT_CHANNEL_CAPACITY};
pub use self::groups::{GroupRegistry, ALL_CLIENTS};
pub use self::policy::SendPolicy;
