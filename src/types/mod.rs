//! Core data types for the Pomodoro Tracker.
//!
//! This module defines the data structures used for:
//! - Timer modes and states
//! - Sessions, categories and user settings (the persisted shapes)
//! - IPC request/response serialization

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::StatisticsReport;

// ============================================================================
// TimerMode
// ============================================================================

/// Which kind of interval the countdown represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    /// Focused work interval
    #[default]
    Work,
    /// Short break between work intervals
    ShortBreak,
    /// Long break after every fourth work interval
    LongBreak,
}

impl TimerMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::ShortBreak => "short_break",
            TimerMode::LongBreak => "long_break",
        }
    }

    /// Returns true for both break modes.
    pub fn is_break(&self) -> bool {
        !matches!(self, TimerMode::Work)
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Work => "Focus",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }
}

// ============================================================================
// TimerStatus
// ============================================================================

/// Countdown state, independent of [`TimerMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    /// Not counting; remaining time holds the full duration of the mode
    #[default]
    Idle,
    /// Counting down once per second
    Running,
    /// Suspended by the user
    Paused,
    /// Reached zero; leaves this state after the completion delay
    Completed,
}

impl TimerStatus {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Completed => "completed",
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Allowed work duration range in seconds (1-120 minutes).
pub const WORK_DURATION_RANGE: std::ops::RangeInclusive<u32> = 60..=7200;

/// Allowed short break range in seconds (1-30 minutes).
pub const SHORT_BREAK_RANGE: std::ops::RangeInclusive<u32> = 60..=1800;

/// Allowed long break range in seconds (1-60 minutes).
pub const LONG_BREAK_RANGE: std::ops::RangeInclusive<u32> = 60..=3600;

/// Per-user timer settings. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub work_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    /// Start break countdowns automatically after a work interval
    pub auto_start_breaks: bool,
    /// Start work countdowns automatically after a break
    pub auto_start_pomodoros: bool,
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: 1500,
            short_break_duration: 300,
            long_break_duration: 900,
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            notifications_enabled: true,
        }
    }
}

impl Settings {
    /// Full countdown length for the given mode.
    pub fn duration_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work_duration,
            TimerMode::ShortBreak => self.short_break_duration,
            TimerMode::LongBreak => self.long_break_duration,
        }
    }

    /// Whether an interval of `next` mode should start without user input.
    pub fn auto_start_for(&self, next: TimerMode) -> bool {
        match next {
            TimerMode::Work => self.auto_start_pomodoros,
            TimerMode::ShortBreak | TimerMode::LongBreak => self.auto_start_breaks,
        }
    }

    /// Validates the duration bounds.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if !WORK_DURATION_RANGE.contains(&self.work_duration) {
            return Err("Work duration must be between 1 and 120 minutes".to_string());
        }
        if !SHORT_BREAK_RANGE.contains(&self.short_break_duration) {
            return Err("Short break must be between 1 and 30 minutes".to_string());
        }
        if !LONG_BREAK_RANGE.contains(&self.long_break_duration) {
            return Err("Long break must be between 1 and 60 minutes".to_string());
        }
        Ok(())
    }
}

/// Partial settings update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_break_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_break_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start_breaks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start_pomodoros: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
}

impl SettingsPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a copy of `settings` with this patch merged in.
    pub fn apply_to(&self, settings: &Settings) -> Settings {
        Settings {
            work_duration: self.work_duration.unwrap_or(settings.work_duration),
            short_break_duration: self
                .short_break_duration
                .unwrap_or(settings.short_break_duration),
            long_break_duration: self
                .long_break_duration
                .unwrap_or(settings.long_break_duration),
            auto_start_breaks: self.auto_start_breaks.unwrap_or(settings.auto_start_breaks),
            auto_start_pomodoros: self
                .auto_start_pomodoros
                .unwrap_or(settings.auto_start_pomodoros),
            notifications_enabled: self
                .notifications_enabled
                .unwrap_or(settings.notifications_enabled),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// One completed timer interval, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(rename = "type")]
    pub mode: TimerMode,
    /// Interval length in seconds
    pub duration: u32,
    pub completed: bool,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields the timer supplies when an interval reaches zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub mode: TimerMode,
    pub duration: u32,
    pub category_id: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl NewSession {
    /// Start time, derived by walking the duration back from completion.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.completed_at - Duration::seconds(i64::from(self.duration))
    }
}

// ============================================================================
// Category
// ============================================================================

/// A tag attached to sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl NewCategory {
    /// Checks for a non-empty name and a `#rrggbb` color.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Category name must not be empty".to_string());
        }
        let hex = self.color.strip_prefix('#').unwrap_or_default();
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Invalid color '{}', expected #rrggbb", self.color));
        }
        Ok(())
    }
}

/// Built-in categories offered before any custom ones.
pub fn default_categories() -> Vec<Category> {
    [
        ("work", "Work", "#e85d5d", "💼"),
        ("study", "Study", "#3b82f6", "📚"),
        ("coding", "Coding", "#10b981", "💻"),
        ("writing", "Writing", "#8b5cf6", "✍️"),
        ("reading", "Reading", "#f59e0b", "📖"),
        ("exercise", "Exercise", "#ef4444", "🏃"),
    ]
    .into_iter()
    .map(|(id, name, color, icon)| Category {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
        icon: Some(icon.to_string()),
        user_id: None,
        created_at: None,
        updated_at: None,
    })
    .collect()
}

// ============================================================================
// IPC Types
// ============================================================================

/// Read-only view of the timer for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub state: TimerStatus,
    pub mode: TimerMode,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    /// Work intervals completed since the last reset
    pub completed_work: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Elapsed share of the current interval, 0-100
    pub progress: f64,
    /// Which store backs this daemon ("hosted" or "local")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Most recent persistence or connectivity error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !value
}

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Start or resume the countdown
    Start {
        #[serde(rename = "categoryId", default, skip_serializing_if = "Option::is_none")]
        category_id: Option<String>,
        /// Drop the selected category instead of keeping it
        #[serde(rename = "clearCategory", default, skip_serializing_if = "is_false")]
        clear_category: bool,
    },
    /// Pause the running countdown
    Pause,
    /// Stop and rewind the current interval
    Stop,
    /// Return to the first work interval
    Reset,
    /// Query the timer state
    Status,
    /// Compute statistics from stored sessions
    Stats,
    /// Read the current settings
    Settings,
    /// Merge a settings patch
    UpdateSettings { patch: SettingsPatch },
    /// List known categories
    Categories,
    /// Create a custom category
    CreateCategory {
        #[serde(flatten)]
        fields: NewCategory,
    },
}

/// Payload carried by a successful response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponseData {
    Timer(TimerSnapshot),
    Statistics(Box<StatisticsReport>),
    Settings(Settings),
    Categories(Vec<Category>),
    Category(Category),
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for success responses.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Returns the timer snapshot, if this response carries one.
    pub fn timer(&self) -> Option<&TimerSnapshot> {
        match &self.data {
            Some(ResponseData::Timer(snapshot)) => Some(snapshot),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
