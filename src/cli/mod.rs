//! CLI module for the Pomodoro Tracker.
//!
//! This module provides the command-line interface:
//! - `auth`: Sign-in to the hosted backend
//! - `commands`: Command definitions using clap derive
//! - `client`: IPC client for daemon communication
//! - `display`: Output formatting and display logic
//! - `monitor`: System metrics polling over the HTTP API

pub mod auth;
pub mod client;
pub mod commands;
pub mod display;
pub mod monitor;

pub use client::IpcClient;
pub use commands::{CategoriesCommand, Cli, Commands, LoginArgs, SettingsCommand, StartArgs};
pub use display::Display;
