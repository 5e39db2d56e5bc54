//! LeadScout application shell
//!
//! This is the thin shell that parses the command line, wires the crates
//! together and serves the HTTP API. Core business logic lives in the
//! `crates/` directory.

pub mod api;
pub mod cli;
mod commands;
pub mod error;
pub mod state;

use crate::cli::{Cli, Command};
use crate::state::AppState;
use anyhow::Context;
use leadscout_core::AppConfig;
use std::sync::Arc;
use tracing::info;

/// Initialize tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,leadscout=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting LeadScout v{}", env!("CARGO_PKG_VERSION"));

    let config =
        AppConfig::load_with_env(cli.config.as_deref()).context("failed to load configuration")?;
    let state = AppState::initialize(config).await?;

    match cli.command {
        Command::Run {
            towns,
            industries,
            name,
        } => commands::run_session(&state, name, towns, industries).await,
        Command::Serve { bind } => serve(state, bind).await,
        Command::Sessions { command } => commands::sessions(&state, command).await,
        Command::Retry { session_id } => commands::retry(&state, &session_id).await,
    }
}

/// Serve the HTTP API until Ctrl-C.
async fn serve(state: AppState, bind: Option<String>) -> anyhow::Result<()> {
    let addr = bind.unwrap_or_else(|| state.config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("LeadScout API listening on {}", addr);

    axum::serve(listener, api::router(Arc::new(state)))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down; running sessions will be marked stopped on next start");
        })
        .await
        .context("HTTP server failed")
}
