use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;

use ssecast_core::error::{Result, SseCastError};

/// What a producer does when a recipient's channel is full.
///
/// Chosen once per broker. A closed channel or a disconnect while the send
/// was in flight is always reported as `UnknownRecipient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum SendPolicy {
    /// Await capacity. Unblocks with an error once the client disconnects.
    Block,
    /// Await capacity for at most `timeout_ms`, then report `ChannelFull`.
    Timeout { timeout_ms: u64 },
    /// Never wait: a full channel reports `ChannelFull` immediately.
    #[serde(alias = "drop")]
    Discard,
}

impl Default for SendPolicy {
    fn default() -> Self {
        SendPolicy::Timeout { timeout_ms: 1500 }
    }
}

impl SendPolicy {
    /// `gone` is the recipient's connection token; a pending wait ends as
    /// soon as it fires.
    pub(crate) async fn deliver<T>(
        &self,
        client_id: &str,
        tx: &mpsc::Sender<T>,
        gone: &CancellationToken,
        event: T,
    ) -> Result<()> {
        if gone.is_cancelled() {
            return Err(SseCastError::UnknownRecipient(client_id.to_string()));
        }
        match *self {
            SendPolicy::Block => wait_send(client_id, tx, gone, event).await,
            SendPolicy::Timeout { timeout_ms } => {
                let wait = wait_send(client_id, tx, gone, event);
                match timeout(Duration::from_millis(timeout_ms), wait).await {
                    Ok(res) => res,
                    Err(_) => Err(SseCastError::ChannelFull(format!(
                        "{client_id} (waited {timeout_ms}ms)"
                    ))),
                }
            }
            SendPolicy::Discard => tx.try_send(event).map_err(|e| match e {
                TrySendError::Full(_) => SseCastError::ChannelFull(client_id.to_string()),
                TrySendError::Closed(_) => SseCastError::UnknownRecipient(client_id.to_string()),
            }),
        }
    }
}

async fn wait_send<T>(
    client_id: &str,
    tx: &mpsc::Sender<T>,
    gone: &CancellationToken,
    event: T,
) -> Result<()> {
    let sent = tokio::select! {
        biased;
        _ = gone.cancelled() => false,
        res = tx.send(event) => res.is_ok(),
    };
    if sent {
        Ok(())
    } else {
        Err(SseCastError::UnknownRecipient(client_id.to_string()))
    }
}
