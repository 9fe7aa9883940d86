//! HTTP route handlers for the daemon's API.
//!
//! - `GET /api/health` - Liveness, uptime and process memory
//! - `GET /api/system/info` - Host CPU and memory sample
//! - `GET /api/statistics` - Statistics report over stored sessions
//!
//! Any other method on these paths answers `405 Method Not Allowed` with a
//! JSON error body.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::{ProcessMemory, SystemMonitor};
use crate::stats::StatisticsReport;
use crate::store::Store;

// ============================================================================
// Application State
// ============================================================================

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub monitor: SystemMonitor,
    pub store: Arc<Store>,
    /// Daemon start time for uptime reporting
    pub start_time: Instant,
    /// Deployment environment name reported by health
    pub environment: String,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<Store>, environment: impl Into<String>) -> Self {
        Self {
            monitor: SystemMonitor::new(),
            store,
            start_time: Instant::now(),
            environment: environment.into(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store.kind())
            .field("start_time", &self.start_time)
            .field("environment", &self.environment)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the API router with tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(get_health).fallback(method_not_allowed))
        .route(
            "/api/system/info",
            get(get_system_info).fallback(method_not_allowed),
        )
        .route(
            "/api/statistics",
            get(get_statistics).fallback(method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Response Types
// ============================================================================

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl ToString) -> Self {
        self.details = Some(details.to_string());
        self
    }
}

/// Health check response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 time of the check
    pub timestamp: String,
    /// Seconds since the daemon started
    pub uptime: u64,
    pub memory: ProcessMemory,
    pub version: String,
    pub environment: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/health
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let memory = match state.monitor.process_memory().await {
        Ok(memory) => memory,
        Err(e) => {
            tracing::debug!(error = %e, "Process memory unavailable");
            ProcessMemory::default()
        }
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.start_time.elapsed().as_secs(),
        memory,
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.environment.clone(),
    })
}

/// GET /api/system/info
async fn get_system_info(State(state): State<AppState>) -> Response {
    match state.monitor.sample().await {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to sample system metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to get system information").with_details(e)),
            )
                .into_response()
        }
    }
}

/// GET /api/statistics
async fn get_statistics(State(state): State<AppState>) -> Response {
    let loaded = async {
        let sessions = state.store.list_sessions().await?;
        let categories = state.store.list_categories().await?;
        Ok::<_, crate::store::StoreError>((sessions, categories))
    }
    .await;

    match loaded {
        Ok((sessions, categories)) => {
            Json(StatisticsReport::compute_local(&sessions, &categories)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load statistics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to load statistics").with_details(e)),
            )
                .into_response()
        }
    }
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("Method not allowed")),
    )
        .into_response()
}

// ============================================================================
// Tests
// ============================================================================
