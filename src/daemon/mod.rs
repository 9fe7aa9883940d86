//! Daemon module for the Pomodoro Tracker.
//!
//! This module contains the core daemon functionality:
//! - `timer`: Timer engine with state transitions and countdown logic
//! - `scheduler`: The single periodic tick task driving the engine
//! - `recorder`: Persists completed intervals and sends notifications
//! - `connection`: Periodic reachability check of the hosted store
//! - `ipc`: Unix socket server answering CLI requests
//!
//! [`run`] wires these together with the session store and the HTTP API.

pub mod connection;
pub mod ipc;
pub mod recorder;
pub mod scheduler;
pub mod timer;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::config::Config;
use crate::notification::{CommandNotifier, NotificationPermission, Notifier};
use crate::server::{self, AppState};
use crate::store::Store;
use crate::types::Settings;

pub use connection::ConnectionMonitor;
pub use ipc::{IpcError, IpcServer, RequestHandler};
pub use recorder::{ErrorSlot, SessionRecorder};
pub use scheduler::TickScheduler;
pub use timer::{TickOutcome, TimerEngine, TimerError, TimerEvent};

/// How long shutdown waits for queued sessions to be written.
///
/// Longer than one hosted store request.
pub const RECORDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the daemon until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the socket or the HTTP port cannot be bound.
pub async fn run(config: Config) -> Result<()> {
    tracing::info!(
        socket = %config.socket_path.display(),
        port = config.http_port,
        environment = %config.environment,
        "Starting daemon"
    );

    let connection = Store::connect(&config.hosted, config.data_dir.clone()).await?;
    let store = Arc::new(connection.store);
    let last_error = Arc::new(ErrorSlot::new(connection.fallback_reason));
    tracing::info!(store = store.kind().as_str(), "Session store ready");

    let settings = match store.get_settings().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load settings, using defaults");
            last_error.set(format!("Failed to load settings: {}", e));
            Settings::default()
        }
    };

    let notifier = Arc::new(CommandNotifier::new());
    // Asked once so a later settings change can enable notifications
    let permission = notifier.request_permission().await;
    if permission != NotificationPermission::Granted {
        tracing::warn!(?permission, "Desktop notifications unavailable");
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let engine = Arc::new(Mutex::new(TimerEngine::new(settings, event_tx)));
    let scheduler = Arc::new(TickScheduler::new(Arc::clone(&engine)));

    let recorder = SessionRecorder::new(
        Arc::clone(&engine),
        Arc::clone(&store),
        notifier,
        Arc::clone(&last_error),
    );
    let (recorder_stop_tx, recorder_stop_rx) = oneshot::channel::<()>();
    let mut recorder_handle = tokio::spawn(recorder.run_until(event_rx, async move {
        let _ = recorder_stop_rx.await;
    }));

    let ipc_server = IpcServer::new(&config.socket_path)?;
    let monitor_handle = tokio::spawn(
        ConnectionMonitor::new(Arc::clone(&store), Arc::clone(&last_error)).run(),
    );
    let handler = Arc::new(RequestHandler::new(
        Arc::clone(&engine),
        Arc::clone(&scheduler),
        Arc::clone(&store),
        last_error,
    ));

    let listener = server::bind(config.http_port).await?;
    let state = AppState::new(Arc::clone(&store), config.environment.clone());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let http_handle = tokio::spawn(server::serve(listener, state, async move {
        let _ = stop_rx.await;
    }));

    tokio::select! {
        result = ipc_server.run(handler) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "IPC server stopped");
            }
        }
        _ = shutdown_signal() => {}
    }

    tracing::info!("Daemon shutting down");
    scheduler.cancel();
    monitor_handle.abort();
    let _ = stop_tx.send(());
    match http_handle.await {
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP API stopped with error"),
        Err(e) => tracing::error!(error = %e, "HTTP API task failed"),
        Ok(Ok(())) => {}
    }
    let _ = recorder_stop_tx.send(());
    match tokio::time::timeout(RECORDER_DRAIN_TIMEOUT, &mut recorder_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Session recorder task failed"),
        Err(_) => {
            tracing::warn!(
                timeout = ?RECORDER_DRAIN_TIMEOUT,
                "Session recorder did not finish in time, pending sessions may be lost"
            );
            recorder_handle.abort();
        }
    }
    drop(ipc_server);

    tracing::info!("Daemon shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
