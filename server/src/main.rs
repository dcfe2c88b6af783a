//! Firmware update daemon.
//!
//! Exposes the dual-system firmware update service over WebSocket sessions, with HTTP
//! endpoints for health and platform status. Startup reconciliation runs before the
//! listener is bound, so no caller request is served ahead of it.

mod config;
mod error;
mod handlers;
mod platform;
mod routes;
mod websocket;

use std::sync::{Arc, Mutex};

use axum::Router;
use fwupdate_engine::{BootSession, FwUpdateService};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::SharedService;
use crate::platform::FilePlatform;
use crate::websocket::ConnectionManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: SharedService<FilePlatform>,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
    /// Flips to true once the platform has been asked to reset
    pub reset: watch::Receiver<bool>,
}

/// Build the router for `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fwupdate_daemon=debug,fwupdate_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        "Starting Firmware Update Daemon on {}:{}",
        config.host,
        config.port
    );

    let (reset_tx, reset_rx) = watch::channel(false);
    let platform = FilePlatform::open(&config, reset_tx)?;
    tracing::info!(path = %platform.path().display(), "Platform state ready");

    tracing::info!("Running startup reconciliation...");
    let service = tokio::task::spawn_blocking(move || {
        FwUpdateService::start(platform, BootSession::new())
    })
    .await?;

    let state = AppState {
        service: Arc::new(Mutex::new(service)),
        config: Arc::new(config.clone()),
        conn_manager: ConnectionManager::new_shared(),
        reset: reset_rx.clone(),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal(reset_rx))
        .await?;

    tracing::info!("Daemon stopped");
    Ok(())
}

/// Resolves on Ctrl-C or once the platform requests a reset.
async fn shutdown_signal(mut reset: watch::Receiver<bool>) {
    let resetting = async move {
        if reset.wait_for(|resetting| *resetting).await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = resetting => tracing::warn!("Device reset, shutting down"),
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown requested");
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    /// Config backed by a state file unique to this test.
    pub fn temp_config(tag: &str) -> Config {
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "fwupdate-{}-{}-{}.json",
            tag,
            std::process::id(),
            n
        ));
        let _ = std::fs::remove_file(&path);

        Config::from_lookup(|key| match key {
            "STATE_PATH" => Some(path.display().to_string()),
            "FIRMWARE_VERSION" => Some("FW_1".to_string()),
            "BOOTLOADER_VERSION" => Some("BL_1".to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// Started application state over a fresh state file.
    pub fn test_state(tag: &str) -> AppState {
        let config = temp_config(tag);
        let (reset_tx, reset_rx) = watch::channel(false);
        let platform = FilePlatform::open(&config, reset_tx).unwrap();
        let service = FwUpdateService::start(platform, BootSession::new());

        AppState {
            service: Arc::new(Mutex::new(service)),
            config: Arc::new(config),
            conn_manager: ConnectionManager::new_shared(),
            reset: reset_rx,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn reset_triggers_shutdown() {
        let (tx, rx) = watch::channel(false);
        let shutdown = tokio::spawn(shutdown_signal(rx));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!shutdown.is_finished());

        tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn dropped_reset_channel_does_not_shut_down() {
        let (tx, rx) = watch::channel(false);
        let shutdown = tokio::spawn(shutdown_signal(rx));
        drop(tx);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!shutdown.is_finished());
        shutdown.abort();
    }
}
