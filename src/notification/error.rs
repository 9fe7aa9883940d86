//! Notification system error types.
//!
//! None of these are fatal: the timer keeps running whatever happens to a
//! notification.

use thiserror::Error;

/// Errors that can occur in the notification system.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// No notification command is available on this system.
    #[error("notification command not found: {0}")]
    CommandNotFound(String),

    /// Notification permission has been denied.
    #[error("notification permission denied")]
    PermissionDenied,

    /// The notification command ran but failed.
    #[error("failed to send notification: {0}")]
    SendFailed(String),

    /// The notification command did not finish in time.
    #[error("notification command timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid input provided to the notification system.
    #[error("invalid notification input: {0}")]
    InvalidInput(String),
}

impl NotificationError {
    /// Returns true if this error is related to permissions.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::CommandNotFound(_))
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::CommandNotFound(_) => {
                "Install libnotify (notify-send) or run on macOS to enable notifications"
            }
            Self::PermissionDenied => "Allow notifications for your terminal in the system settings",
            Self::SendFailed(_) | Self::Timeout(_) => "Check that the desktop notification service is running",
            Self::InvalidInput(_) => "Check the notification text",
        }
    }
}
