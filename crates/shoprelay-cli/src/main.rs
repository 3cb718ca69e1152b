#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use shoprelay_server::handler::routes;
use shoprelay_server::service::ServiceState;
use tower_http::trace::TraceLayer;

use crate::config::Cli;

/// Tracing target for server startup events.
pub const TRACING_TARGET_SERVER_STARTUP: &str = "shoprelay_cli::server::startup";

/// Tracing target for server shutdown events.
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "shoprelay_cli::server::shutdown";

/// Tracing target for configuration loading.
pub const TRACING_TARGET_CONFIG: &str = "shoprelay_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.validate()?;
    cli.log();

    let state = create_service_state(&cli).await?;
    let router = create_router(state);

    server::serve(router, cli.server).await?;

    Ok(())
}

/// Creates the service state from configuration.
async fn create_service_state(cli: &Cli) -> anyhow::Result<ServiceState> {
    ServiceState::from_config(&cli.service)
        .await
        .context("failed to create service state")
}

/// Creates the router with tracing middleware applied.
fn create_router(state: ServiceState) -> Router {
    routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
