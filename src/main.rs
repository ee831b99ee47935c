use anyhow::Context;
use std::io;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use link_checker::{
    app_config::ServerConfig, build_router, services::rendering::run_self_test, AppConfig,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "link_checker=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!(
        "Starting link checker ({} environment)",
        config.server.environment
    );

    let listener = bind_listener(&config.server).await?;
    let state = AppState::from_config(config);

    // Non-fatal: page checks degrade to "no issue" when rendering is unavailable
    match state.rendering.clone() {
        Some(pool) => {
            tokio::spawn(run_self_test(pool));
        },
        None => info!("Rendering disabled, ad density and redirect checks are skipped"),
    }

    info!("Link checker listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Link checker stopped");
    Ok(())
}

/// Bind the configured address, or an OS-assigned port when it is taken
/// and fallback is enabled.
async fn bind_listener(server: &ServerConfig) -> anyhow::Result<TcpListener> {
    match TcpListener::bind(server.bind_address.as_str()).await {
        Ok(listener) => Ok(listener),
        Err(e) if e.kind() == io::ErrorKind::AddrInUse && server.port_fallback => {
            let host = server
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or("0.0.0.0");
            warn!("Port {} is in use, falling back to a free port", server.port);
            TcpListener::bind(format!("{}:0", host))
                .await
                .context("Failed to bind fallback port")
        },
        Err(e) => Err(e).with_context(|| format!("Failed to bind {}", server.bind_address)),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
