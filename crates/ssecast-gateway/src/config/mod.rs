//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use ssecast_core::error::{Result, SseCastError};

pub use schema::{AppConfig, BrokerSection, GatewaySection, StreamerSection};

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| SseCastError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<AppConfig> {
    let cfg: AppConfig = serde_yaml::from_str(s)
        .map_err(|e| SseCastError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
