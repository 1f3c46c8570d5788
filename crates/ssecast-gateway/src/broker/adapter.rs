//! Message adapters: turn one typed event into one frame for one recipient.
//!
//! Adapters run on the recipient's stream task, so a failure only affects
//! that client. They must be deterministic and free of side effects.

use std::fmt::Display;

use serde::Serialize;

use ssecast_core::error::Result;
use ssecast_core::protocol::FramedMessage;

pub trait MessageAdapter<T>: Send + Sync {
    fn adapt(&self, event: &T, client_id: &str) -> Result<FramedMessage>;
}

/// Default adapter: `Display` output as data, no event name, no id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayAdapter;

impl<T: Display> MessageAdapter<T> for DisplayAdapter {
    fn adapt(&self, event: &T, _client_id: &str) -> Result<FramedMessage> {
        Ok(FramedMessage::new(event.to_string()))
    }
}

/// Serializes the event as JSON data.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

impl<T: Serialize> MessageAdapter<T> for JsonAdapter {
    fn adapt(&self, event: &T, _client_id: &str) -> Result<FramedMessage> {
        FramedMessage::from_json(event)
    }
}

/// Wraps a closure `(event, client_id) -> Result<FramedMessage>`.
#[derive(Clone, Copy)]
pub struct FnAdapter<F>(pub F);

impl<T, F> MessageAdapter<T> for FnAdapter<F>
where
    F: Fn(&T, &str) -> Result<FramedMessage> + Send + Sync,
{
    fn adapt(&self, event: &T, client_id: &str) -> Result<FramedMessage> {
        (self.0)(event, client_id)
    }
}
