//! Event-stream endpoints.
//!
//! Each connection gets a `ChannelSink` whose receiver becomes the response
//! body; hyper writes every chunk as soon as it is produced, and dropping the
//! body on client disconnect is the cancellation signal the stream loop sees.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::stream;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

use ssecast_core::protocol::{CACHE_CONTROL, CONTENT_TYPE};

use crate::app_state::AppState;
use crate::stream::{ChannelSink, StreamHandler, Streamer};
use crate::transport::ApiError;

/// Frames buffered between the stream loop and hyper.
const FRAME_BUFFER: usize = 1;

/// `GET /v1/stream/:client_id`
pub async fn stream_events(
    State(app): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Response, ApiError> {
    let (sink, frames) = ChannelSink::new(FRAME_BUFFER);
    let handler = StreamHandler::open(&app.broker(), client_id, sink)
        .await?
        .with_keep_alive(app.cfg().gateway.keep_alive());

    tokio::spawn(handler.run());
    Ok(event_stream_response(frames))
}

/// `GET /v1/clock`: one private stream of server time, once per second.
///
/// The ticker stops as soon as the stream loop ends, so a dropped body
/// leaves nothing running.
pub async fn stream_clock(State(app): State<AppState>) -> Response {
    let lease = app.lease_clock_stream();
    let (sink, frames) = ChannelSink::new(FRAME_BUFFER);
    let stream_lease = Arc::clone(&lease);
    let streamer: Streamer<u64> = Streamer::new(app.cfg().streamer.channel_capacity)
        .with_label("clock")
        .with_shutdown(app.broker().shutdown_token())
        .with_keep_alive(app.cfg().gateway.keep_alive())
        .on_disconnect(move || drop(stream_lease));
    let ticks = streamer.sender();

    tokio::spawn(async move {
        let _lease = lease;
        let mut every = interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                biased;
                _ = ticks.closed() => break,
                _ = every.tick() => {}
            }
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            if ticks.send(now).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        if let Err(e) = streamer.stream(sink).await {
            tracing::warn!(error = %e, "clock stream failed to start");
        }
    });

    event_stream_response(frames)
}

fn event_stream_response(frames: mpsc::Receiver<Bytes>) -> Response {
    let body = Body::from_stream(stream::unfold(frames, |mut rx| async move {
        rx.recv().await.map(|frame| (Ok::<_, Infallible>(frame), rx))
    }));

    (
        [
            (header::CONTENT_TYPE, CONTENT_TYPE),
            (header::CACHE_CONTROL, CACHE_CONTROL),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}
