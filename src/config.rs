//! Daemon configuration.
//!
//! Parsed from environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `POMODORO_SOCKET_PATH` | `~/.pomodoro-tracker/pomodoro.sock` | IPC socket |
//! | `POMODORO_DATA_DIR` | `<data dir>/pomodoro-tracker` | Local store directory |
//! | `POMODORO_HTTP_PORT` | 3000 | HTTP API port |
//! | `POMODORO_ENV` | development | Reported by the health endpoint |
//! | `POMODORO_SUPABASE_URL` | - | Hosted backend URL |
//! | `POMODORO_SUPABASE_ANON_KEY` | - | Hosted backend anon key |
//! | `POMODORO_SUPABASE_ACCESS_TOKEN` | - | Fixed access token, overrides `login` |
//!
//! With the URL and anon key set, the daemon uses the sign-in saved by
//! `pomodoro-tracker login`. Without them it runs against the local store.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::store::HostedConfig;

/// Default HTTP API port.
pub const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default environment name.
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Directory under the home directory holding the socket.
const SOCKET_DIR: &str = ".pomodoro-tracker";

const SOCKET_FILE: &str = "pomodoro.sock";

const DATA_DIR_NAME: &str = "pomodoro-tracker";

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),

    /// No home or data directory could be determined.
    #[error("cannot determine {0} directory")]
    NoDirectory(&'static str),
}

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub http_port: u16,
    pub environment: String,
    pub hosted: HostedConfig,
}

impl Config {
    /// Parses configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the port is not a valid u16 or no default
    /// directory can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parses configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let socket_path = match var("POMODORO_SOCKET_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_socket_path()?,
        };
        let data_dir = match var("POMODORO_DATA_DIR") {
            Some(path) => PathBuf::from(path),
            None => default_data_dir()?,
        };
        let http_port = match var("POMODORO_HTTP_PORT") {
            Some(port) => parse_port(&port)?,
            None => DEFAULT_HTTP_PORT,
        };
        let environment = var("POMODORO_ENV").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let hosted = HostedConfig {
            url: var("POMODORO_SUPABASE_URL"),
            anon_key: var("POMODORO_SUPABASE_ANON_KEY"),
            access_token: var("POMODORO_SUPABASE_ACCESS_TOKEN"),
        };

        Ok(Self {
            socket_path,
            data_dir,
            http_port,
            environment,
            hosted,
        })
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    let port: u16 = value.trim().parse()?;
    if port == 0 {
        return Err(ConfigError::InvalidFormat {
            var: "POMODORO_HTTP_PORT".to_string(),
            message: "port must be non-zero".to_string(),
        });
    }
    Ok(port)
}

/// `~/.pomodoro-tracker/pomodoro.sock`
pub fn default_socket_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoDirectory("home"))?;
    Ok(home.join(SOCKET_DIR).join(SOCKET_FILE))
}

/// Socket path honoring `POMODORO_SOCKET_PATH`, as the CLI resolves it.
pub fn socket_path_from_env() -> Result<PathBuf, ConfigError> {
    match env::var("POMODORO_SOCKET_PATH") {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => default_socket_path(),
    }
}

/// `<platform data dir>/pomodoro-tracker`
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(SOCKET_DIR)))
        .ok_or(ConfigError::NoDirectory("data"))?;
    Ok(base.join(DATA_DIR_NAME))
}
