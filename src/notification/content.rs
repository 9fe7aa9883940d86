//! Notification text for completed intervals.

use super::error::NotificationError;
use crate::types::TimerMode;

/// Maximum length for titles and bodies.
const MAX_TEXT_LENGTH: usize = 200;

/// Title and body of one desktop notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

impl NotificationContent {
    /// Checks both fields before they are handed to the platform command.
    pub fn validate(&self) -> Result<(), NotificationError> {
        validate_text("title", &self.title)?;
        validate_text("body", &self.body)
    }

    /// Content shown when an interval of `mode` reaches zero.
    #[must_use]
    pub fn for_completed(mode: TimerMode) -> Self {
        let (title, body) = match mode {
            TimerMode::Work => ("Pomodoro Complete! 🍅", "Great work! Time for a break."),
            TimerMode::ShortBreak | TimerMode::LongBreak => {
                ("Break Complete!", "Ready to get back to work?")
            }
        };
        Self {
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

fn validate_text(field: &str, text: &str) -> Result<(), NotificationError> {
    if text.trim().is_empty() {
        return Err(NotificationError::InvalidInput(format!("{} is empty", field)));
    }
    if text.chars().count() > MAX_TEXT_LENGTH {
        return Err(NotificationError::InvalidInput(format!(
            "{} exceeds {} characters",
            field, MAX_TEXT_LENGTH
        )));
    }
    Ok(())
}
