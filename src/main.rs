use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use devops_adapter::api::{self, AppState};
use devops_adapter::config;
use devops_adapter::session::SessionStore;
use devops_adapter::upstream::transport::HttpTransport;

#[tokio::main]
async fn main() -> Result<()> {
    if dotenvy::dotenv().is_err() {
        eprintln!("No .env file found");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("devops_adapter=info,tower_http=info")),
        )
        .init();

    let config = config::load_config()?;

    let sessions = Arc::new(
        SessionStore::new(config.upstream_settings(), Arc::new(HttpTransport::new()))
            .with_ttl(config.session_ttl()),
    );
    let app = api::router(
        AppState {
            sessions: sessions.clone(),
        },
        &config.server.allowed_origins,
    );

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, upstream = %config.upstream.host, "server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sessions.shutdown();
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
