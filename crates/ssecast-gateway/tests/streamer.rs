#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;

use ssecast_core::error::{Result, SseCastError};
use ssecast_gateway::broker::JsonAdapter;
use ssecast_gateway::stream::{ChannelSink, FrameSink, StreamExit, Streamer};

struct BufferedSink;

#[async_trait]
impl FrameSink for BufferedSink {
    fn can_stream(&self) -> bool {
        false
    }

    async fn write_frame(&mut self, _frame: Bytes) -> Result<()> {
        Ok(())
    }

    async fn closed(&self) {}
}

fn counted<T: Send + 'static>(streamer: Streamer<T>) -> (Streamer<T>, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    let streamer = streamer.on_disconnect(move || {
        h.fetch_add(1, Ordering::SeqCst);
    });
    (streamer, hits)
}

#[tokio::test]
async fn streams_until_producers_are_gone() {
    let (streamer, hits) = counted(Streamer::<u32>::new(4));
    let tx = streamer.sender();
    let (sink, mut frames) = ChannelSink::new(4);
    let task = tokio::spawn(streamer.stream(sink));

    tx.send(1).await.unwrap();
    tx.send(2).await.unwrap();
    assert_eq!(frames.recv().await.unwrap(), Bytes::from_static(b"data: 1\n\n"));
    assert_eq!(frames.recv().await.unwrap(), Bytes::from_static(b"data: 2\n\n"));

    drop(tx);
    assert_eq!(task.await.unwrap(), Ok(StreamExit::ChannelClosed));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn client_gone_fires_hook_once() {
    let (streamer, hits) = counted(Streamer::<u32>::new(4));
    let _tx = streamer.sender();
    let (sink, frames) = ChannelSink::new(1);
    let task = tokio::spawn(streamer.stream(sink));

    drop(frames);
    assert_eq!(task.await.unwrap(), Ok(StreamExit::ClientGone));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn setup_failure_still_fires_hook() {
    let (streamer, hits) = counted(Streamer::<u32>::new(4));
    let res = streamer.stream(BufferedSink).await;

    assert!(matches!(res, Err(SseCastError::SetupFailure(_))));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_token_stops_the_loop() {
    let (streamer, hits) = counted(Streamer::<u32>::new(4));
    let _tx = streamer.sender();
    let stop = streamer.shutdown_token();
    let (sink, _frames) = ChannelSink::new(1);
    let task = tokio::spawn(streamer.stream(sink));

    stop.cancel();
    assert_eq!(task.await.unwrap(), Ok(StreamExit::Shutdown));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn custom_adapter_and_label() {
    let streamer = Streamer::<serde_json::Value>::with_adapter(2, JsonAdapter).with_label("feed");
    let tx = streamer.sender();
    let (sink, mut frames) = ChannelSink::new(2);
    tokio::spawn(streamer.stream(sink));

    tx.send(json!({"price": 10})).await.unwrap();
    assert_eq!(
        frames.recv().await.unwrap(),
        Bytes::from_static(b"data: {\"price\":10}\n\n")
    );
}
