//! Beefweb Bridge
//!
//! Exposes a beefweb-enabled player as a generic media player entity.

use beefweb_bridge::adapters::api_spec::ApiDescription;
use beefweb_bridge::adapters::beefweb::{BeefwebClient, DEFAULT_BASE_PATH};
use beefweb_bridge::adapters::{BeefwebPlayer, PlayerHandle, SharedPlayer};
use beefweb_bridge::config::PlayerConfig;
use beefweb_bridge::{api, bus, config};

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beefweb_bridge=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting Beefweb Bridge v{} ({})",
        env!("BEEFWEB_BRIDGE_VERSION"),
        env!("BEEFWEB_BRIDGE_GIT_SHA")
    );

    let config = config::load_config()?;
    tracing::info!(
        "Configuration loaded: player {} at {}:{}, API port {}",
        config.player.name,
        config.player.host,
        config.player.port,
        config.port
    );

    let bus = bus::create_bus();

    let base_path = resolve_base_path(&config.player);
    let client = BeefwebClient::new(&config.player.host, config.player.port, &base_path)?;
    tracing::info!("Beefweb client targeting {}", client.base_url());

    let player: SharedPlayer = Arc::new(BeefwebPlayer::new(config.player.name.clone(), client));

    let shutdown = CancellationToken::new();
    let handle = PlayerHandle::new(player, bus.clone(), shutdown.clone())
        .with_poll_interval(Duration::from_secs(config.poll_interval_secs.max(1)));

    let poller = tokio::spawn(handle.clone().run());

    let app = api::router(api::AppState::new(handle, bus.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Stopping poller...");
    shutdown.cancel();
    if let Err(e) = poller.await {
        tracing::warn!("Poller task ended abnormally: {}", e);
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Base path from the configured interface description, or the beefweb default
fn resolve_base_path(player: &PlayerConfig) -> String {
    let Some(path) = player.api_spec_path() else {
        return DEFAULT_BASE_PATH.to_string();
    };

    match ApiDescription::load(&path) {
        Ok(description) => {
            let base_path = description.base_path();
            tracing::info!(
                "Loaded interface description {} (base path {:?})",
                path.display(),
                base_path
            );
            base_path
        }
        Err(e) => {
            tracing::warn!("{}; using default base path {}", e, DEFAULT_BASE_PATH);
            DEFAULT_BASE_PATH.to_string()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
