//! API Server for the agent relay
//!
//! Serves the chat API (session creation and streamed agent replies) and,
//! when enabled, the WhatsApp webhook.

mod error;
mod routes;
mod sse;
mod state;
mod whatsapp;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_core::agent::{connect_engine, token_source};
use relay_core::RelayConfig;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "api_server=debug,relay_core=info,relay_whatsapp=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelayConfig::from_env();
    tracing::info!("Feature flags: {:?}", config.features);

    let engine = connect_engine(&config, token_source(&config)).await;
    if engine.is_none() {
        tracing::warn!("Starting without an Agent Engine; agent endpoints will answer 500");
    }

    let app_state = AppState::from_config(&config, engine);
    let app = routes::app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .await
        .context("server error")?;

    Ok(())
}
