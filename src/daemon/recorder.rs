//! Session recorder.
//!
//! Consumes timer events and performs the side effects of a completed
//! interval: one session record in the store and, when enabled, a desktop
//! notification. Failures never reach the engine; a failed write is kept as
//! the daemon's last error and shown by `status`.

use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};

use super::timer::{TimerEngine, TimerEvent};
use crate::notification::{NotificationContent, Notifier};
use crate::store::Store;
use crate::types::{NewSession, TimerMode};

/// Most recent user-visible error of the daemon.
#[derive(Debug, Default)]
pub struct ErrorSlot(StdMutex<Option<String>>);

impl ErrorSlot {
    pub fn new(initial: Option<String>) -> Self {
        Self(StdMutex::new(initial))
    }

    pub fn set(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(message.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = None;
        }
    }

    /// Clears the slot if its message satisfies `predicate`.
    pub fn clear_if(&self, predicate: impl Fn(&str) -> bool) {
        if let Ok(mut slot) = self.0.lock() {
            if slot.as_deref().is_some_and(predicate) {
                *slot = None;
            }
        }
    }

    pub fn get(&self) -> Option<String> {
        self.0.lock().ok().and_then(|slot| slot.clone())
    }
}

/// Persists completed intervals and announces them.
pub struct SessionRecorder<N> {
    engine: Arc<Mutex<TimerEngine>>,
    store: Arc<Store>,
    notifier: Arc<N>,
    last_error: Arc<ErrorSlot>,
}

impl<N: Notifier> SessionRecorder<N> {
    pub fn new(
        engine: Arc<Mutex<TimerEngine>>,
        store: Arc<Store>,
        notifier: Arc<N>,
        last_error: Arc<ErrorSlot>,
    ) -> Self {
        Self {
            engine,
            store,
            notifier,
            last_error,
        }
    }

    /// Handles events until the engine's sender is dropped.
    pub async fn run(self, events: mpsc::UnboundedReceiver<TimerEvent>) {
        self.run_until(events, std::future::pending()).await;
    }

    /// Handles events until the sender is dropped or `shutdown` resolves.
    ///
    /// On shutdown the channel is closed to new events and everything
    /// already queued is still handled, so a session completed just before
    /// the daemon stops is not lost. An event being handled when `shutdown`
    /// resolves is finished first.
    pub async fn run_until<F>(self, mut events: mpsc::UnboundedReceiver<TimerEvent>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        tracing::debug!("Timer event channel closed, recorder exiting");
                        return;
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        events.close();
        let mut drained = 0usize;
        while let Some(event) = events.recv().await {
            self.handle(event).await;
            drained += 1;
        }
        tracing::debug!(drained, "Recorder drained pending events");
    }

    /// Handles one event.
    pub async fn handle(&self, event: TimerEvent) {
        match event {
            TimerEvent::SessionCompleted {
                mode,
                duration_seconds,
                category_id,
                completed_work,
            } => {
                tracing::info!(
                    mode = mode.as_str(),
                    duration = duration_seconds,
                    completed_work,
                    "Recording completed session"
                );
                self.record(mode, duration_seconds, category_id).await;
                self.announce(mode).await;
            }
            TimerEvent::ModeChanged { mode, auto_started } => {
                tracing::info!(mode = mode.as_str(), auto_started, "Next interval loaded");
            }
            TimerEvent::Tick { .. } => {}
            other => tracing::debug!(event = ?other, "Timer event"),
        }
    }

    async fn record(&self, mode: TimerMode, duration: u32, category_id: Option<String>) {
        let new = NewSession {
            mode,
            duration,
            category_id,
            completed_at: Utc::now(),
        };

        match self.store.create_session(new).await {
            Ok(session) => {
                tracing::debug!(id = %session.id, "Session saved");
                self.last_error.clear();
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    transient = e.is_transient(),
                    suggestion = e.suggestion(),
                    "Failed to save session"
                );
                self.last_error.set(format!("Failed to save session: {}", e));
            }
        }
    }

    async fn announce(&self, mode: TimerMode) {
        let enabled = self.engine.lock().await.settings().notifications_enabled;
        if !enabled || !self.notifier.permission().is_granted() {
            return;
        }

        let content = NotificationContent::for_completed(mode);
        match self.notifier.show(&content).await {
            Ok(()) => {}
            Err(e) if e.is_permission_error() => {
                tracing::debug!(error = %e, "Notification skipped");
            }
            Err(e) => {
                tracing::warn!(error = %e, suggestion = e.suggestion(), "Failed to show notification");
            }
        }
    }
}
