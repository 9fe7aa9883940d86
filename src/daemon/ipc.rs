//! IPC Server for the Pomodoro Tracker.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer, settings, category and statistics commands
//! - Integration with TimerEngine, TickScheduler and the session store

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};

use crate::stats::StatisticsReport;
use crate::store::Store;
use crate::types::{IpcRequest, IpcResponse, NewCategory, ResponseData, SettingsPatch, TimerSnapshot};

use super::recorder::ErrorSlot;
use super::scheduler::TickScheduler;
use super::timer::TimerEngine;

// ============================================================================
// Constants
// ============================================================================

/// Maximum request size in bytes (4KB)
pub const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        // Remove a stale socket left by a previous daemon
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        tracing::info!(path = %socket_path.display(), "IPC server listening");

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE + 1];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            anyhow::bail!("Connection closed by client");
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer[..n])
            .map_err(|e| IpcError::SerializationError(e.to_string()))?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;
        stream.shutdown().await.context("Failed to close response stream")?;

        Ok(())
    }

    /// Serves one request on an accepted connection.
    pub async fn serve_connection(handler: &RequestHandler, mut stream: UnixStream) -> Result<()> {
        let response = match Self::receive_request(&mut stream).await {
            Ok(request) => handler.handle(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected IPC request");
                IpcResponse::error(format!("Invalid request: {}", e))
            }
        };
        Self::send_response(&mut stream, &response).await
    }

    /// Accepts connections until the task is dropped, one task per client.
    pub async fn run(&self, handler: Arc<RequestHandler>) -> Result<()> {
        loop {
            let stream = match self.accept().await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    continue;
                }
            };
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                if let Err(e) = Self::serve_connection(&handler, stream).await {
                    tracing::debug!(error = %e, "IPC connection ended with error");
                }
            });
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the engine, scheduler and store.
pub struct RequestHandler {
    engine: Arc<Mutex<TimerEngine>>,
    scheduler: Arc<TickScheduler>,
    store: Arc<Store>,
    last_error: Arc<ErrorSlot>,
}

impl RequestHandler {
    pub fn new(
        engine: Arc<Mutex<TimerEngine>>,
        scheduler: Arc<TickScheduler>,
        store: Arc<Store>,
        last_error: Arc<ErrorSlot>,
    ) -> Self {
        Self {
            engine,
            scheduler,
            store,
            last_error,
        }
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        tracing::debug!(request = ?request, "IPC request");
        match request {
            IpcRequest::Start {
                category_id,
                clear_category,
            } => self.handle_start(category_id, clear_category).await,
            IpcRequest::Pause => self.handle_pause().await,
            IpcRequest::Stop => self.handle_stop().await,
            IpcRequest::Reset => self.handle_reset().await,
            IpcRequest::Status => self.handle_status().await,
            IpcRequest::Stats => self.handle_stats().await,
            IpcRequest::Settings => self.handle_settings().await,
            IpcRequest::UpdateSettings { patch } => self.handle_update_settings(patch).await,
            IpcRequest::Categories => self.handle_categories().await,
            IpcRequest::CreateCategory { fields } => self.handle_create_category(fields).await,
        }
    }

    fn snapshot(&self, engine: &TimerEngine) -> TimerSnapshot {
        let mut snapshot = engine.snapshot();
        snapshot.store = Some(self.store.kind().as_str().to_string());
        snapshot.last_error = self.last_error.get();
        snapshot
    }

    fn timer_response(&self, message: &str, engine: &TimerEngine) -> IpcResponse {
        IpcResponse::success(message, Some(ResponseData::Timer(self.snapshot(engine))))
    }

    async fn handle_start(&self, category_id: Option<String>, clear_category: bool) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        match engine.start() {
            Ok(()) => {
                // Without either, the previous selection carries over
                if clear_category {
                    engine.set_category(None);
                } else if category_id.is_some() {
                    engine.set_category(category_id);
                }
                self.scheduler.schedule();
                self.timer_response("Timer started", &engine)
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_pause(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;

        match engine.pause() {
            Ok(()) => {
                self.scheduler.cancel();
                self.timer_response("Timer paused", &engine)
            }
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }

    async fn handle_stop(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        self.scheduler.cancel();
        engine.stop();
        self.timer_response("Timer stopped", &engine)
    }

    async fn handle_reset(&self) -> IpcResponse {
        let mut engine = self.engine.lock().await;
        self.scheduler.cancel();
        engine.reset();
        self.timer_response("Timer reset", &engine)
    }

    async fn handle_status(&self) -> IpcResponse {
        let engine = self.engine.lock().await;
        self.timer_response("", &engine)
    }

    async fn handle_stats(&self) -> IpcResponse {
        let sessions = match self.store.list_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => return IpcResponse::error(format!("Failed to load sessions: {}", e)),
        };
        let categories = match self.store.list_categories().await {
            Ok(categories) => categories,
            Err(e) => return IpcResponse::error(format!("Failed to load categories: {}", e)),
        };

        let report = StatisticsReport::compute_local(&sessions, &categories);
        IpcResponse::success("", Some(ResponseData::Statistics(Box::new(report))))
    }

    async fn handle_settings(&self) -> IpcResponse {
        match self.store.get_settings().await {
            Ok(settings) => IpcResponse::success("", Some(ResponseData::Settings(settings))),
            Err(e) => IpcResponse::error(format!("Failed to load settings: {}", e)),
        }
    }

    async fn handle_update_settings(&self, patch: SettingsPatch) -> IpcResponse {
        if patch.is_empty() {
            return IpcResponse::error("No settings to update");
        }

        let merged = {
            let engine = self.engine.lock().await;
            patch.apply_to(engine.settings())
        };
        if let Err(e) = merged.validate() {
            return IpcResponse::error(e);
        }

        match self.store.upsert_settings(&patch).await {
            Ok(stored) => {
                self.engine.lock().await.apply_settings(stored.clone());
                tracing::info!(settings = ?stored, "Settings updated");
                IpcResponse::success("Settings updated", Some(ResponseData::Settings(stored)))
            }
            Err(e) => IpcResponse::error(format!("Failed to update settings: {}", e)),
        }
    }

    async fn handle_categories(&self) -> IpcResponse {
        match self.store.list_categories().await {
            Ok(categories) => IpcResponse::success("", Some(ResponseData::Categories(categories))),
            Err(e) => IpcResponse::error(format!("Failed to load categories: {}", e)),
        }
    }

    async fn handle_create_category(&self, fields: NewCategory) -> IpcResponse {
        if let Err(e) = fields.validate() {
            return IpcResponse::error(e);
        }

        match self.store.create_category(fields).await {
            Ok(category) => IpcResponse::success(
                format!("Category '{}' created", category.name),
                Some(ResponseData::Category(category)),
            ),
            Err(e) => IpcResponse::error(format!("Failed to create category: {}", e)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
