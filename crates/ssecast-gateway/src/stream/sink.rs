use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use ssecast_core::error::{Result, SseCastError};

/// Destination of encoded frames for one connection.
#[async_trait]
pub trait FrameSink: Send + Sync {
    /// Whether each write reaches the peer without waiting for more data.
    /// Stream loops refuse to start on a sink that returns `false`.
    fn can_stream(&self) -> bool {
        true
    }

    /// Write one frame and flush it.
    async fn write_frame(&mut self, frame: Bytes) -> Result<()>;

    /// Resolves once the peer is gone.
    async fn closed(&self);
}

/// Sink backed by a bounded channel of frames; the receiver side feeds a
/// response body (or a test).
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write_frame(&mut self, frame: Bytes) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| SseCastError::TransportFailure("peer closed the stream".into()))
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}
