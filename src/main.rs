//! Sourdough Log - Server Entry Point
//!
//! This is the main entry point for the sourdough-server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use sourdough_log::api::{create_router, AppState};
use sourdough_log::session::spawn_auto_logger;
use sourdough_log::{
    BakeSession, BakeStore, BakeStoreConfig, Config, HomeAssistantSensor, NoSensor,
    TemperatureSource,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();

    let store = BakeStore::open(BakeStoreConfig::new(&config.data_dir))
        .context("failed to open data directory")?;

    let home_assistant = HomeAssistantSensor::from_config(&config.sensor)
        .context("failed to build sensor client")?;
    let sensor: Arc<dyn TemperatureSource> = match home_assistant {
        Some(sensor) => {
            tracing::info!("Home Assistant temperature sensor enabled");
            Arc::new(sensor)
        }
        None => {
            tracing::info!("no temperature sensor configured");
            Arc::new(NoSensor)
        }
    };

    let session = Arc::new(BakeSession::new(Arc::new(store), sensor));

    let autolog = match config.autolog_interval {
        Some(every) if session.sensor_enabled() => {
            Some(spawn_auto_logger(Arc::clone(&session), every))
        }
        _ => None,
    };

    let app = create_router(Arc::new(AppState::new(session)));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, data_dir = %config.data_dir.display(), "sourdough server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = autolog {
        handle.abort();
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
