//! Pomodoro Tracker Library
//!
//! This library provides the core functionality for the Pomodoro Tracker.
//! It includes:
//! - Timer engine for work/break cycles and its tick scheduler
//! - Session store with a hosted backend and a local fallback
//! - Statistics aggregation (daily heatmap, weekly rollups, categories, streak)
//! - IPC server/client for daemon-CLI communication
//! - HTTP API for health, system metrics and statistics
//! - Desktop notifications for completed intervals

pub mod cli;
pub mod config;
pub mod daemon;
pub mod metrics;
pub mod notification;
pub mod server;
pub mod stats;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError};
pub use daemon::{TickScheduler, TimerEngine, TimerError, TimerEvent};
pub use stats::StatisticsReport;
pub use store::{Store, StoreError, StoreKind};
pub use types::{
    Category, IpcRequest, IpcResponse, NewCategory, ResponseData, Session, Settings,
    SettingsPatch, TimerMode, TimerSnapshot, TimerStatus,
};
