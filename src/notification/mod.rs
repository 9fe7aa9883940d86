//! Desktop notifications for completed intervals.
//!
//! The [`Notifier`] trait is the seam between the session recorder and the
//! platform. [`CommandNotifier`] shells out to the system notification
//! command; [`MockNotifier`] records calls for tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use pomodoro_tracker::notification::{CommandNotifier, NotificationContent, Notifier};
//! use pomodoro_tracker::types::TimerMode;
//!
//! let notifier = CommandNotifier::new();
//! if notifier.request_permission().await.is_granted() {
//!     notifier.show(&NotificationContent::for_completed(TimerMode::Work)).await?;
//! }
//! ```

pub mod command;
pub mod content;
pub mod error;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

pub use self::command::CommandNotifier;
pub use self::content::NotificationContent;
pub use self::error::NotificationError;

/// Whether the user allows notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// Not requested yet
    #[default]
    Default,
}

impl NotificationPermission {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Something that can show desktop notifications.
pub trait Notifier: Send + Sync {
    /// Current permission state, without prompting.
    fn permission(&self) -> NotificationPermission;

    /// Asks for permission and returns the resulting state.
    fn request_permission(&self) -> impl Future<Output = NotificationPermission> + Send;

    /// Shows one notification. Fails with [`NotificationError::PermissionDenied`]
    /// unless permission has been granted.
    fn show(
        &self,
        content: &NotificationContent,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// Test double that records every notification it is asked to show.
#[derive(Debug)]
pub struct MockNotifier {
    shown: Mutex<Vec<NotificationContent>>,
    permission: Mutex<NotificationPermission>,
    grant_on_request: AtomicBool,
    should_fail: AtomicBool,
}

impl MockNotifier {
    /// Creates a mock that grants permission when asked.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shown: Mutex::new(Vec::new()),
            permission: Mutex::new(NotificationPermission::Default),
            grant_on_request: AtomicBool::new(true),
            should_fail: AtomicBool::new(false),
        }
    }

    /// Creates a mock with permission already granted.
    #[must_use]
    pub fn granted() -> Self {
        let mock = Self::new();
        mock.set_permission(NotificationPermission::Granted);
        mock
    }

    pub fn set_permission(&self, permission: NotificationPermission) {
        *self.permission.lock().unwrap() = permission;
    }

    pub fn set_grant_on_request(&self, grant: bool) {
        self.grant_on_request.store(grant, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Notifications shown so far.
    pub fn shown(&self) -> Vec<NotificationContent> {
        self.shown.lock().unwrap().clone()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for MockNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap()
    }

    async fn request_permission(&self) -> NotificationPermission {
        let permission = if self.grant_on_request.load(Ordering::SeqCst) {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        self.set_permission(permission);
        permission
    }

    async fn show(&self, content: &NotificationContent) -> Result<(), NotificationError> {
        if !self.permission().is_granted() {
            return Err(NotificationError::PermissionDenied);
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("mock failure".to_string()));
        }
        self.shown.lock().unwrap().push(content.clone());
        Ok(())
    }
}
