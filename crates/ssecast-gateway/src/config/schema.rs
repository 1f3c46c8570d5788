use serde::Deserialize;
use tokio::time::Duration;

use ssecast_core::error::{Result, SseCastError};

use crate::broker::{SendPolicy, DEFAULT_CHANNEL_CAPACITY};
use crate::stream::DEFAULT_STREAMER_CAPACITY;

const MAX_CHANNEL_CAPACITY: usize = 65536;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub broker: BrokerSection,

    #[serde(default)]
    pub streamer: StreamerSection,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(SseCastError::UnsupportedVersion);
        }
        self.gateway.validate()?;
        self.broker.validate()?;
        check_capacity("streamer.channel_capacity", self.streamer.channel_capacity)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// 0 disables keep-alive comments.
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            keep_alive_ms: default_keep_alive_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.keep_alive_ms != 0 && !(1000..=300000).contains(&self.keep_alive_ms) {
            return Err(SseCastError::BadRequest(
                "gateway.keep_alive_ms must be 0 or between 1000 and 300000".into(),
            ));
        }
        Ok(())
    }

    pub fn keep_alive(&self) -> Option<Duration> {
        (self.keep_alive_ms > 0).then(|| Duration::from_millis(self.keep_alive_ms))
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_keep_alive_ms() -> u64 {
    15000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerSection {
    #[serde(default = "default_broker_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub send_policy: SendPolicy,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            channel_capacity: default_broker_capacity(),
            send_policy: SendPolicy::default(),
        }
    }
}

impl BrokerSection {
    pub fn validate(&self) -> Result<()> {
        check_capacity("broker.channel_capacity", self.channel_capacity)?;
        if let SendPolicy::Timeout { timeout_ms } = self.send_policy {
            if !(1..=60000).contains(&timeout_ms) {
                return Err(SseCastError::BadRequest(
                    "broker.send_policy.timeout_ms must be between 1 and 60000".into(),
                ));
            }
        }
        Ok(())
    }
}

fn default_broker_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamerSection {
    #[serde(default = "default_streamer_capacity")]
    pub channel_capacity: usize,
}

impl Default for StreamerSection {
    fn default() -> Self {
        Self {
            channel_capacity: default_streamer_capacity(),
        }
    }
}

fn default_streamer_capacity() -> usize {
    DEFAULT_STREAMER_CAPACITY
}

fn check_capacity(field: &str, v: usize) -> Result<()> {
    if !(1..=MAX_CHANNEL_CAPACITY).contains(&v) {
        return Err(SseCastError::BadRequest(format!(
            "{field} must be between 1 and {MAX_CHANNEL_CAPACITY}"
        )));
    }
    Ok(())
}
