//! Single-client streamer: one bounded channel, one consumer, no registry.

use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use ssecast_core::error::{Result, SseCastError};

use crate::broker::{DisplayAdapter, MessageAdapter};
use crate::stream::pump::{pump, StreamExit};
use crate::stream::sink::FrameSink;

pub const DEFAULT_STREAMER_CAPACITY: usize = 100;

type DisconnectHook = Box<dyn FnOnce() + Send>;

pub struct Streamer<T> {
    label: String,
    tx: mpsc::Sender<T>,
    rx: mpsc::Receiver<T>,
    adapter: Arc<dyn MessageAdapter<T>>,
    on_disconnect: Option<DisconnectHook>,
    keep_alive: Option<Duration>,
    shutdown: CancellationToken,
}

impl<T: Display + Send + 'static> Streamer<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_adapter(capacity, DisplayAdapter)
    }
}

impl<T: Send + 'static> Streamer<T> {
    pub fn with_adapter(capacity: usize, adapter: impl MessageAdapter<T> + 'static) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            label: "stream".to_string(),
            tx,
            rx,
            adapter: Arc::new(adapter),
            on_disconnect: None,
            keep_alive: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Recipient name passed to the adapter and used in logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_keep_alive(mut self, every: Option<Duration>) -> Self {
        self.keep_alive = every;
        self
    }

    /// Share a cancellation token, e.g. the broker's, so process shutdown ends this stream.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Runs exactly once when [`Streamer::stream`] finishes, whatever the reason.
    pub fn on_disconnect(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_disconnect = Some(Box::new(hook));
        self
    }

    /// Producer handle. The loop ends with `ChannelClosed` once every handle is dropped.
    pub fn sender(&self) -> mpsc::Sender<T> {
        self.tx.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn stream<S: FrameSink>(self, mut sink: S) -> Result<StreamExit> {
        let Streamer {
            label,
            tx,
            mut rx,
            adapter,
            on_disconnect,
            keep_alive,
            shutdown,
        } = self;
        let _hook = HookGuard(on_disconnect);
        drop(tx);

        if !sink.can_stream() {
            return Err(SseCastError::SetupFailure(format!(
                "sink for {label} cannot flush incrementally"
            )));
        }

        let exit = pump(&label, &mut rx, &mut sink, adapter.as_ref(), &shutdown, keep_alive).await;
        tracing::debug!(stream = %label, exit = ?exit, "streamer closed");
        Ok(exit)
    }
}

struct HookGuard(Option<DisconnectHook>);

impl Drop for HookGuard {
    fn drop(&mut self) {
        if let Some(hook) = self.0.take() {
            hook();
        }
    }
}
