use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use ssecast_core::error::{Result, SseCastError};
use ssecast_core::protocol::{keep_alive, FramedMessage};

use crate::broker::MessageAdapter;
use crate::stream::sink::FrameSink;

/// Why a stream loop ended.
#[derive(Debug, PartialEq, Eq)]
pub enum StreamExit {
    /// Broker or streamer shutdown was requested.
    Shutdown,
    /// The broker disconnected this client.
    Disconnected,
    /// The peer went away (transport cancellation signal).
    ClientGone,
    /// Every sender of the channel was dropped.
    ChannelClosed,
    /// A write or flush failed.
    TransportFailure(SseCastError),
}

enum Next<T> {
    Event(T),
    KeepAlive,
    Exit(StreamExit),
}

/// Shared loop: dequeue, adapt, encode, write + flush.
///
/// `stop` is honoured while waiting for an event and while a write is
/// pending, so a peer that stopped reading cannot pin the loop. It returns
/// `Shutdown`; callers refine that. The channel is closed on every exit.
pub(crate) async fn pump<T, S>(
    recipient: &str,
    rx: &mut mpsc::Receiver<T>,
    sink: &mut S,
    adapter: &dyn MessageAdapter<T>,
    stop: &CancellationToken,
    keep_alive_every: Option<Duration>,
) -> StreamExit
where
    S: FrameSink,
{
    let exit = pump_frames(recipient, rx, sink, adapter, stop, keep_alive_every).await;
    rx.close();
    exit
}

async fn pump_frames<T, S>(
    recipient: &str,
    rx: &mut mpsc::Receiver<T>,
    sink: &mut S,
    adapter: &dyn MessageAdapter<T>,
    stop: &CancellationToken,
    keep_alive_every: Option<Duration>,
) -> StreamExit
where
    S: FrameSink,
{
    let mut ka = keep_alive_every.map(|every| {
        let mut t = tokio::time::interval_at(Instant::now() + every, every);
        t.set_missed_tick_behavior(MissedTickBehavior::Delay);
        t
    });

    loop {
        let next = tokio::select! {
            biased;
            _ = stop.cancelled() => Next::Exit(StreamExit::Shutdown),
            _ = sink.closed() => Next::Exit(StreamExit::ClientGone),
            ev = rx.recv() => match ev {
                Some(ev) => Next::Event(ev),
                None => Next::Exit(StreamExit::ChannelClosed),
            },
            _ = tick(&mut ka) => Next::KeepAlive,
        };

        let frame = match next {
            Next::Exit(exit) => return exit,
            Next::KeepAlive => keep_alive(),
            Next::Event(ev) => match render(adapter, &ev, recipient) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(client = %recipient, error = %e, "event could not be formatted");
                    match error_frame(&e) {
                        Ok(frame) => frame,
                        Err(_) => continue,
                    }
                }
            },
        };

        let written = tokio::select! {
            biased;
            _ = stop.cancelled() => return StreamExit::Shutdown,
            res = sink.write_frame(frame) => res,
        };
        if let Err(e) = written {
            tracing::debug!(client = %recipient, error = %e, "stream write failed");
            return StreamExit::TransportFailure(e);
        }
        // keep-alives only go out after a full idle period
        if let Some(t) = ka.as_mut() {
            t.reset();
        }
    }
}

fn render<T>(adapter: &dyn MessageAdapter<T>, ev: &T, recipient: &str) -> Result<Bytes> {
    adapter.adapt(ev, recipient)?.encode()
}

/// Reported to the affected client only; the stream continues.
fn error_frame(e: &SseCastError) -> Result<Bytes> {
    FramedMessage::new(e.to_string()).with_event("error").encode()
}

async fn tick(ka: &mut Option<Interval>) {
    match ka {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}
