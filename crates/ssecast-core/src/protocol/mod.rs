//! Wire protocol primitives.
//!
//! Only one format exists today: the `text/event-stream` framing in [`frame`].

pub mod frame;

pub use frame::{keep_alive, FramedMessage, CACHE_CONTROL, CONTENT_TYPE};
