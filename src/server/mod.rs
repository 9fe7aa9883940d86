//! HTTP API served by the daemon.

pub mod routes;

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;

pub use routes::{create_router, AppState, ErrorResponse, HealthResponse};

/// Binds the API on all interfaces at `port`.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP API on {}", addr))?;
    tracing::info!(%addr, "HTTP API listening");
    Ok(listener)
}

/// Serves the API until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP API server error")
}
