//! Shared application state for the ssecast gateway.
//!
//! Owns the loaded config and the one broker that lives for the whole process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ssecast_core::error::Result;

use crate::broker::Broker;
use crate::config::AppConfig;
use crate::notice::{Notice, NoticeAdapter};

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<AppConfig>,
    broker: Broker<Notice>,
    clock_streams: Arc<AtomicUsize>,
}

/// Held by every task serving one clock stream; the stream stops counting
/// once the last holder is dropped.
pub(crate) struct ClockStreamLease(Arc<AtomicUsize>);

impl Drop for ClockStreamLease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl AppState {
    /// Build application state. Must run inside the tokio runtime.
    pub fn new(cfg: AppConfig) -> Result<Self> {
        cfg.validate()?;

        let broker = Broker::builder(NoticeAdapter)
            .channel_capacity(cfg.broker.channel_capacity)
            .send_policy(cfg.broker.send_policy)
            .on_connect(|client| tracing::debug!(%client, "connected hook"))
            .on_disconnect(|client| tracing::debug!(%client, "disconnected hook"))
            .build();

        Ok(Self {
            cfg: Arc::new(cfg),
            broker,
            clock_streams: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn broker(&self) -> Broker<Notice> {
        self.broker.clone()
    }

    /// Clock streams whose ticker or stream loop is still running.
    pub fn clock_streams(&self) -> usize {
        self.clock_streams.load(Ordering::Relaxed)
    }

    pub(crate) fn lease_clock_stream(&self) -> Arc<ClockStreamLease> {
        self.clock_streams.fetch_add(1, Ordering::Relaxed);
        Arc::new(ClockStreamLease(Arc::clone(&self.clock_streams)))
    }
}
