//! Desktop notifications through the platform's notification command.
//!
//! - macOS: `osascript -e 'display notification ...'`
//! - elsewhere: `notify-send TITLE BODY`
//!
//! Each invocation runs with a timeout so a hung notification daemon never
//! blocks the session recorder.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::content::NotificationContent;
use super::error::NotificationError;
use super::{NotificationPermission, Notifier};

/// Default timeout for one notification command in seconds.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

#[cfg(target_os = "macos")]
const NOTIFY_COMMAND: &str = "osascript";

#[cfg(not(target_os = "macos"))]
const NOTIFY_COMMAND: &str = "notify-send";

/// Looks up an executable by name in `PATH`.
#[must_use]
pub fn find_command(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Escapes a string for use inside an AppleScript string literal.
fn applescript_quote(text: &str) -> String {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn build_command(program: &Path, content: &NotificationContent) -> Command {
    let mut command = Command::new(program);
    if cfg!(target_os = "macos") {
        command.arg("-e").arg(format!(
            "display notification {} with title {}",
            applescript_quote(&content.body),
            applescript_quote(&content.title)
        ));
    } else {
        command.arg(&content.title).arg(&content.body);
    }
    command.kill_on_drop(true);
    command
}

/// Notifier backed by the platform notification command.
#[derive(Debug)]
pub struct CommandNotifier {
    program: Option<PathBuf>,
    timeout_seconds: u64,
    permission: Mutex<NotificationPermission>,
}

impl CommandNotifier {
    /// Creates a notifier using the platform's default command.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(find_command(NOTIFY_COMMAND), DEFAULT_TIMEOUT_SECONDS)
    }

    /// Creates a notifier for an explicit program (or none).
    #[must_use]
    pub fn with_program(program: Option<PathBuf>, timeout_seconds: u64) -> Self {
        Self {
            program,
            timeout_seconds,
            permission: Mutex::new(NotificationPermission::Default),
        }
    }

    fn set_permission(&self, permission: NotificationPermission) {
        if let Ok(mut guard) = self.permission.lock() {
            *guard = permission;
        }
    }
}

impl Default for CommandNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for CommandNotifier {
    fn permission(&self) -> NotificationPermission {
        self.permission
            .lock()
            .map(|guard| *guard)
            .unwrap_or(NotificationPermission::Denied)
    }

    async fn request_permission(&self) -> NotificationPermission {
        let permission = if self.program.is_some() {
            NotificationPermission::Granted
        } else {
            warn!(command = NOTIFY_COMMAND, "Notification command not found, notifications disabled");
            NotificationPermission::Denied
        };
        self.set_permission(permission);
        permission
    }

    async fn show(&self, content: &NotificationContent) -> Result<(), NotificationError> {
        if self.permission() != NotificationPermission::Granted {
            return Err(NotificationError::PermissionDenied);
        }
        content.validate()?;
        let program = self
            .program
            .as_deref()
            .ok_or_else(|| NotificationError::CommandNotFound(NOTIFY_COMMAND.to_string()))?;

        let mut command = build_command(program, content);
        let result = timeout(Duration::from_secs(self.timeout_seconds), command.output()).await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                debug!(title = %content.title, "Notification shown");
                Ok(())
            }
            Ok(Ok(output)) => Err(NotificationError::SendFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
            Ok(Err(e)) => Err(NotificationError::SendFailed(e.to_string())),
            Err(_) => Err(NotificationError::Timeout(self.timeout_seconds)),
        }
    }
}
