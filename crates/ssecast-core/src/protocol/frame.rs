//! `text/event-stream` framing.
//!
//! One message per block:
//! ```text
//! event: <name>\n   (omitted if absent)
//! id: <id>\n        (omitted if absent)
//! data: <line>\n    (one per payload line; \r\n, \r and \n all end a line)
//! \n
//! ```
//! Encoding is panic-free; field values that would break the block structure
//! are rejected as `FormattingFailure`.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{Result, SseCastError};

/// Response content type for event streams.
pub const CONTENT_TYPE: &str = "text/event-stream";
/// Intermediaries must not cache or coalesce the stream.
pub const CACHE_CONTROL: &str = "no-cache";

const KEEP_ALIVE: &[u8] = b": keep-alive\n\n";

/// The wire-level unit: optional event name, optional id, data payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramedMessage {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

impl FramedMessage {
    /// Data-only message.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event: None,
            id: None,
            data: data.into(),
        }
    }

    /// Data-only message carrying `value` serialized as JSON.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let data = serde_json::to_string(value)
            .map_err(|e| SseCastError::FormattingFailure(format!("json encode failed: {e}")))?;
        Ok(Self::new(data))
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Append the encoded block to `out`.
    ///
    /// On error nothing is written.
    pub fn write_to(&self, out: &mut BytesMut) -> Result<()> {
        if let Some(event) = &self.event {
            check_field("event", event)?;
        }
        if let Some(id) = &self.id {
            check_field("id", id)?;
        }

        if let Some(event) = &self.event {
            put_field(out, "event", event);
        }
        if let Some(id) = &self.id {
            put_field(out, "id", id);
        }
        for line in data_lines(&self.data) {
            put_field(out, "data", line);
        }
        out.put_u8(b'\n');
        Ok(())
    }

    /// Encode into a standalone buffer, ready to be written and flushed.
    pub fn encode(&self) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(self.data.len() + 16);
        self.write_to(&mut out)?;
        Ok(out.freeze())
    }
}

/// Comment block clients ignore; keeps idle connections open.
pub fn keep_alive() -> Bytes {
    Bytes::from_static(KEEP_ALIVE)
}

fn check_field(name: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(SseCastError::FormattingFailure(format!(
            "{name} must be a single line"
        )));
    }
    Ok(())
}

/// Split on every line terminator a client recognises.
fn data_lines(data: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(data);
    std::iter::from_fn(move || {
        let cur = rest?;
        match cur.find(['\r', '\n']) {
            Some(at) => {
                let skip = if cur[at..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&cur[at + skip..]);
                Some(&cur[..at])
            }
            None => {
                rest = None;
                Some(cur)
            }
        }
    })
}

fn put_field(out: &mut BytesMut, name: &str, value: &str) {
    out.put_slice(name.as_bytes());
    out.put_slice(b": ");
    out.put_slice(value.as_bytes());
    out.put_u8(b'\n');
}
