//! Event type published through the HTTP API.

use serde::Deserialize;
use serde_json::Value;

use ssecast_core::error::{Result, SseCastError};
use ssecast_core::protocol::FramedMessage;

use crate::broker::MessageAdapter;

/// Publish request body, also the broker's element type.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Notice {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub data: Value,
}

/// String data is sent verbatim; anything else as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoticeAdapter;

impl MessageAdapter<Notice> for NoticeAdapter {
    fn adapt(&self, notice: &Notice, _client_id: &str) -> Result<FramedMessage> {
        let data = match &notice.data {
            Value::String(s) => s.clone(),
            other => serde_json::to_string(other)
                .map_err(|e| SseCastError::FormattingFailure(format!("json encode failed: {e}")))?,
        };
        Ok(FramedMessage {
            event: notice.event.clone(),
            id: notice.id.clone(),
            data,
        })
    }
}
