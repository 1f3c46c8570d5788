//! Broker-backed stream handler.
//!
//! Bridges one live connection to one client channel for its full lifetime:
//! capability check, register, drain the channel into the sink, and
//! unregister exactly once on every exit path.

use std::sync::Arc;

use tokio::time::Duration;

use ssecast_core::error::{Result, SseCastError};

use crate::broker::{Broker, ClientSession, MessageAdapter};
use crate::stream::pump::{pump, StreamExit};
use crate::stream::sink::FrameSink;

pub struct StreamHandler<T, S> {
    session: ClientSession<T>,
    sink: S,
    adapter: Arc<dyn MessageAdapter<T>>,
    keep_alive: Option<Duration>,
}

impl<T, S> StreamHandler<T, S>
where
    T: Send + 'static,
    S: FrameSink,
{
    /// Check the sink, then connect `client_id` to the broker.
    ///
    /// A sink that cannot stream fails with `SetupFailure` before anything is
    /// registered.
    pub async fn open(broker: &Broker<T>, client_id: impl Into<String>, sink: S) -> Result<Self> {
        let client_id = client_id.into();
        if !sink.can_stream() {
            return Err(SseCastError::SetupFailure(format!(
                "sink for {client_id} cannot flush incrementally"
            )));
        }
        let session = broker.connect(client_id).await?;
        Ok(Self {
            session,
            sink,
            adapter: broker.adapter(),
            keep_alive: None,
        })
    }

    /// Write a keep-alive comment once nothing has been written for this long.
    pub fn with_keep_alive(mut self, every: Option<Duration>) -> Self {
        self.keep_alive = every;
        self
    }

    pub fn client_id(&self) -> &str {
        self.session.client_id()
    }

    /// Run until the peer leaves, a write fails, the client is disconnected,
    /// or the broker shuts down. The client is unregistered before this returns.
    pub async fn run(self) -> StreamExit {
        let StreamHandler {
            mut session,
            mut sink,
            adapter,
            keep_alive,
        } = self;

        let exit = {
            let (client_id, rx, cancel) = session.parts();
            pump(client_id, rx, &mut sink, adapter.as_ref(), cancel, keep_alive).await
        };
        // only the connection token fired: someone disconnected this client
        let exit = match exit {
            StreamExit::Shutdown if !session.shutdown_token().is_cancelled() => {
                StreamExit::Disconnected
            }
            other => other,
        };

        let client_id = session.client_id().to_string();
        session.disconnect().await;
        tracing::info!(client = %client_id, exit = ?exit, "stream closed");
        exit
    }
}
