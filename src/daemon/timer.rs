//! Timer engine for the Pomodoro Tracker.
//!
//! This module provides the core timer state machine:
//! - State transitions (idle → running ⇄ paused → completed)
//! - Mode sequencing (work → short break, long break after every 4th work interval)
//! - Auto-start policy for the next interval
//! - Event firing for the session recorder and clients
//!
//! The engine never sleeps itself. One tick is one second of countdown and is
//! driven from outside by the [`TickScheduler`](super::scheduler::TickScheduler).

use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{Settings, TimerMode, TimerSnapshot, TimerStatus};

/// Work intervals per cycle; every Nth completed work interval earns a long break.
pub const LONG_BREAK_INTERVAL: u32 = 4;

// ============================================================================
// TimerEvent
// ============================================================================

/// Timer events for the session recorder and external integrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    /// Countdown started or resumed
    Started { mode: TimerMode },
    /// Countdown paused
    Paused,
    /// Countdown stopped and rewound
    Stopped,
    /// Cycle reset to the first work interval
    Reset,
    /// One second elapsed
    Tick {
        /// Remaining seconds
        remaining_seconds: u32,
    },
    /// An interval reached zero
    SessionCompleted {
        mode: TimerMode,
        /// Full length of the finished interval
        duration_seconds: u32,
        category_id: Option<String>,
        /// Work intervals completed so far, this one included
        completed_work: u32,
    },
    /// The next interval was loaded after a completion
    ModeChanged {
        mode: TimerMode,
        /// Whether it started counting immediately
        auto_started: bool,
    },
}

// ============================================================================
// TimerError
// ============================================================================

/// Rejected timer operations. The engine state is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("cannot {action} while the timer is {}", .state.as_str())]
    InvalidTransition {
        action: &'static str,
        state: TimerStatus,
    },
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The timer was not running; nothing changed
    Idle,
    /// One second was counted down
    Counting,
    /// The interval reached zero and the engine is now `completed`
    Completed,
}

/// Mode that follows `current`.
///
/// `completed_work` is the counter after the current interval has been
/// counted, so a work interval that brings it to a multiple of
/// [`LONG_BREAK_INTERVAL`] is followed by a long break.
pub fn next_mode(current: TimerMode, completed_work: u32) -> TimerMode {
    match current {
        TimerMode::Work if completed_work % LONG_BREAK_INTERVAL == 0 => TimerMode::LongBreak,
        TimerMode::Work => TimerMode::ShortBreak,
        TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Work,
    }
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Timer engine that manages the countdown state and emits events.
pub struct TimerEngine {
    settings: Settings,
    status: TimerStatus,
    mode: TimerMode,
    remaining_seconds: u32,
    total_seconds: u32,
    completed_work: u32,
    /// Set while `completed`, consumed by `advance` or `stop`
    pending_mode: Option<TimerMode>,
    category_id: Option<String>,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates an idle engine at the start of a work interval.
    pub fn new(settings: Settings, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        let total_seconds = settings.duration_for(TimerMode::Work);
        Self {
            settings,
            status: TimerStatus::Idle,
            mode: TimerMode::Work,
            remaining_seconds: total_seconds,
            total_seconds,
            completed_work: 0,
            pending_mode: None,
            category_id: None,
            event_tx,
        }
    }

    fn emit(&self, event: TimerEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("Timer event dropped, no receiver");
        }
    }

    fn load_mode(&mut self, mode: TimerMode) {
        self.mode = mode;
        self.total_seconds = self.settings.duration_for(mode);
        self.remaining_seconds = self.total_seconds;
    }

    /// Starts or resumes the countdown.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidTransition`] unless the timer is idle or paused.
    pub fn start(&mut self) -> Result<(), TimerError> {
        match self.status {
            TimerStatus::Idle | TimerStatus::Paused => {
                self.status = TimerStatus::Running;
                tracing::debug!(mode = self.mode.as_str(), remaining = self.remaining_seconds, "Timer started");
                self.emit(TimerEvent::Started { mode: self.mode });
                Ok(())
            }
            state => Err(TimerError::InvalidTransition {
                action: "start",
                state,
            }),
        }
    }

    /// Pauses the countdown.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::InvalidTransition`] unless the timer is running.
    pub fn pause(&mut self) -> Result<(), TimerError> {
        match self.status {
            TimerStatus::Running => {
                self.status = TimerStatus::Paused;
                self.emit(TimerEvent::Paused);
                Ok(())
            }
            state => Err(TimerError::InvalidTransition {
                action: "pause",
                state,
            }),
        }
    }

    /// Stops the countdown and rewinds the current interval.
    ///
    /// Stopping during the completion delay keeps the cycle position by
    /// loading the pending next mode.
    pub fn stop(&mut self) {
        let mode = self.pending_mode.take().unwrap_or(self.mode);
        self.load_mode(mode);
        self.status = TimerStatus::Idle;
        self.emit(TimerEvent::Stopped);
    }

    /// Returns to an idle first work interval with the counter cleared.
    pub fn reset(&mut self) {
        self.pending_mode = None;
        self.completed_work = 0;
        self.load_mode(TimerMode::Work);
        self.status = TimerStatus::Idle;
        self.emit(TimerEvent::Reset);
    }

    /// Counts down one second if running.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != TimerStatus::Running {
            return TickOutcome::Idle;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.emit(TimerEvent::Tick {
            remaining_seconds: self.remaining_seconds,
        });

        if self.remaining_seconds > 0 {
            return TickOutcome::Counting;
        }

        self.complete();
        TickOutcome::Completed
    }

    fn complete(&mut self) {
        self.status = TimerStatus::Completed;
        if self.mode == TimerMode::Work {
            self.completed_work += 1;
        }
        let next = next_mode(self.mode, self.completed_work);
        self.pending_mode = Some(next);

        tracing::info!(
            mode = self.mode.as_str(),
            next = next.as_str(),
            completed_work = self.completed_work,
            "Interval completed"
        );

        self.emit(TimerEvent::SessionCompleted {
            mode: self.mode,
            duration_seconds: self.total_seconds,
            category_id: self.category_id.clone(),
            completed_work: self.completed_work,
        });
    }

    /// Loads the pending next interval after a completion.
    ///
    /// Returns true if the new interval started counting on its own. Does
    /// nothing unless the timer is `completed`.
    pub fn advance(&mut self) -> bool {
        if self.status != TimerStatus::Completed {
            return false;
        }
        let Some(next) = self.pending_mode.take() else {
            return false;
        };

        self.load_mode(next);
        let auto_started = self.settings.auto_start_for(next);
        self.status = if auto_started {
            TimerStatus::Running
        } else {
            TimerStatus::Idle
        };

        self.emit(TimerEvent::ModeChanged {
            mode: next,
            auto_started,
        });
        auto_started
    }

    /// Selects the category recorded with future sessions.
    pub fn set_category(&mut self, category_id: Option<String>) {
        self.category_id = category_id;
    }

    /// Replaces durations and flags. An idle countdown picks up the new
    /// duration immediately; a running or paused one keeps its own.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
        if self.status == TimerStatus::Idle {
            self.load_mode(self.mode);
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn completed_work(&self) -> u32 {
        self.completed_work
    }

    /// Mode that will follow once the completion delay elapses.
    pub fn pending_mode(&self) -> Option<TimerMode> {
        self.pending_mode
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Read-only view for clients.
    pub fn snapshot(&self) -> TimerSnapshot {
        let progress = if self.total_seconds == 0 {
            0.0
        } else {
            f64::from(self.total_seconds - self.remaining_seconds) / f64::from(self.total_seconds)
                * 100.0
        };

        TimerSnapshot {
            state: self.status,
            mode: self.mode,
            remaining_seconds: self.remaining_seconds,
            total_seconds: self.total_seconds,
            completed_work: self.completed_work,
            category_id: self.category_id.clone(),
            progress,
            store: None,
            last_error: None,
        }
    }

    /// Overrides the remaining time (for testing).
    #[cfg(test)]
    pub fn set_remaining_seconds(&mut self, remaining_seconds: u32) {
        self.remaining_seconds = remaining_seconds;
    }
}

// ============================================================================
// Tests
// ============================================================================
