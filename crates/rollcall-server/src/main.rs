//! # rollcall-server
//!
//! HTTP server for the rollcall attendance system.
//!
//! This binary provides:
//! - REST API for classroom check-in, enrollment, and attendance registers
//! - OpenAPI document at `/api/openapi.json`
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package rollcall-server
//!
//! # With a config file and JSON storage
//! ROLLCALL_CONFIG=./rollcall.toml ROLLCALL__STORAGE__BACKEND=json ./rollcall-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::Context;
use rollcall_core::Config;
use rollcall_server::{api, logging, state::AppState};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    logging::init(config.server.production)?;

    info!(
        radius_m = config.geofence.radius_m,
        timezone = %config.calendar.timezone,
        backend = %config.storage.backend,
        "Starting rollcall-server"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config)?;
    let app = api::create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
