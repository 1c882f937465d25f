//! # Dhaba POS Server Binary
//!
//! Wires configuration, database, shared state, the background lock
//! sweeper, and the HTTP router together, then serves until SIGINT/SIGTERM.

use std::net::SocketAddr;

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dhaba_db::{seed, Database, DbConfig};
use pos_server::{build_router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Dhaba POS server...");

    let config = ServerConfig::load()?;
    info!(
        port = config.port,
        database = %config.database_path,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    seed::seed_defaults(&db).await?;

    let state = AppState::new(db, config.clone());
    spawn_lock_sweeper(&state);

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "Starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Periodic request-lock sweep: expired entries stop blocking their
/// fingerprint even if the request that took them never came back.
fn spawn_lock_sweeper(state: &AppState) {
    let locks = state.locks.clone();
    let interval_secs = state.config.lock_sweep_interval_secs;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let evicted = locks.sweep();
            if evicted > 0 {
                debug!(evicted, active = locks.len(), "Swept expired request locks");
            }
        }
    });
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
