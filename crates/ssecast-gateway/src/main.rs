//! ssecast gateway binary.
//!
//! - Event stream: GET /v1/stream/:client_id
//! - Publish: POST /v1/clients/:id/events, /v1/groups/:group/events, /v1/broadcast
//! - Config from `SSECAST_CONFIG` (default `ssecast.yaml`)

use std::error::Error;
use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use ssecast_gateway::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::var("SSECAST_CONFIG").unwrap_or_else(|_| "ssecast.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.gateway.listen.parse()?;

    let state = app_state::AppState::new(cfg)?;
    let broker = state.broker();
    let app = router::build_router(state);

    tracing::info!(%listen, "ssecast-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested, closing streams");
            broker.shutdown();
        })
        .await?;
    Ok(())
}
