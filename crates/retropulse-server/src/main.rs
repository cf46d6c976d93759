//! RetroPulse Server Binary
//!
//! Standalone server for the RetroPulse board API.

use std::sync::Arc;

use retropulse_server::{serve, AppState};

use retropulse_core::RetroConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = RetroConfig::load_standard().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        RetroConfig::default()
    });
    config.validate()?;

    let addr = std::env::var("RETROPULSE_ADDR").unwrap_or_else(|_| config.server.addr.clone());
    let state = Arc::new(AppState::new(config));

    serve(&addr, state).await
}
