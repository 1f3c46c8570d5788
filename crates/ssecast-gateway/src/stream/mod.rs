//! Stream loops that write framed events to live connections.

mod handler;
mod pump;
mod sink;
mod streamer;

pub use handler::StreamHandler;
pub use pump::StreamExit;
pub use sink::{ChannelSink, FrameSink};
pub use streamer::{Streamer, DEFAULT_STREAMER_CAPACITY};
