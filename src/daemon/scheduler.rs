//! Tick scheduling for the timer engine.
//!
//! At most one tick task exists at a time: scheduling aborts the previous
//! task before spawning a new one, so a restarted countdown can never be
//! driven by two tickers.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant, MissedTickBehavior};

use super::timer::{TickOutcome, TimerEngine};

/// Time between two ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Pause between reaching zero and loading the next interval.
pub const COMPLETION_DELAY: Duration = Duration::from_secs(1);

/// Owns the single periodic tick task.
pub struct TickScheduler {
    engine: Arc<Mutex<TimerEngine>>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
    tick_interval: Duration,
    completion_delay: Duration,
}

impl TickScheduler {
    pub fn new(engine: Arc<Mutex<TimerEngine>>) -> Self {
        Self::with_timing(engine, TICK_INTERVAL, COMPLETION_DELAY)
    }

    /// Creates a scheduler with custom timing (shorter intervals in tests).
    pub fn with_timing(
        engine: Arc<Mutex<TimerEngine>>,
        tick_interval: Duration,
        completion_delay: Duration,
    ) -> Self {
        Self {
            engine,
            task: std::sync::Mutex::new(None),
            tick_interval,
            completion_delay,
        }
    }

    /// Replaces any running tick task with a fresh one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self) {
        let engine = Arc::clone(&self.engine);
        let handle = tokio::spawn(run_ticks(engine, self.tick_interval, self.completion_delay));

        if let Ok(mut slot) = self.task.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        } else {
            handle.abort();
        }
        tracing::debug!("Tick task scheduled");
    }

    /// Aborts the tick task, if any.
    pub fn cancel(&self) {
        if let Ok(mut slot) = self.task.lock() {
            if let Some(previous) = slot.take() {
                previous.abort();
                tracing::debug!("Tick task cancelled");
            }
        }
    }

    /// Returns true while a tick task is alive.
    pub fn is_scheduled(&self) -> bool {
        self.task
            .lock()
            .map(|slot| slot.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_ticks(engine: Arc<Mutex<TimerEngine>>, tick_interval: Duration, completion_delay: Duration) {
    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let outcome = engine.lock().await.tick();
        match outcome {
            TickOutcome::Counting => {}
            TickOutcome::Idle => return,
            TickOutcome::Completed => {
                sleep(completion_delay).await;
                let auto_started = engine.lock().await.advance();
                if !auto_started {
                    return;
                }
                ticker.reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::timer::TimerEvent;
    use crate::types::{Settings, TimerMode, TimerStatus};
    use tokio::sync::mpsc;

    const FAST_TICK: Duration = Duration::from_millis(10);
    const FAST_DELAY: Duration = Duration::from_millis(20);

    fn create_scheduler(
        settings: Settings,
    ) -> (
        TickScheduler,
        Arc<Mutex<TimerEngine>>,
        mpsc::UnboundedReceiver<TimerEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Mutex::new(TimerEngine::new(settings, tx)));
        let scheduler = TickScheduler::with_timing(Arc::clone(&engine), FAST_TICK, FAST_DELAY);
        (scheduler, engine, rx)
    }

    #[tokio::test]
    async fn test_schedule_counts_down() {
        let (scheduler, engine, _rx) = create_scheduler(Settings::default());
        engine.lock().await.start().unwrap();
        scheduler.schedule();

        sleep(Duration::from_millis(100)).await;
        let remaining = engine.lock().await.remaining_seconds();
        assert!(remaining < 1500, "remaining = {}", remaining);
        assert!(scheduler.is_scheduled());
    }

    #[tokio::test]
    async fn test_cancel_stops_ticking() {
        let (scheduler, engine, _rx) = create_scheduler(Settings::default());
        engine.lock().await.start().unwrap();
        scheduler.schedule();
        sleep(Duration::from_millis(50)).await;
        scheduler.cancel();

        let after_cancel = engine.lock().await.remaining_seconds();
        sleep(Duration::from_millis(50)).await;
        assert_eq!(engine.lock().await.remaining_seconds(), after_cancel);
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test]
    async fn test_reschedule_replaces_previous_task() {
        let (scheduler, engine, _rx) = create_scheduler(Settings::default());
        engine.lock().await.start().unwrap();

        scheduler.schedule();
        scheduler.schedule();
        scheduler.schedule();
        sleep(Duration::from_millis(105)).await;
        scheduler.cancel();

        // One ticker at 10ms gives about 10 ticks; three would give about 30
        let elapsed = 1500 - engine.lock().await.remaining_seconds();
        assert!(elapsed <= 15, "elapsed = {}", elapsed);
    }

    #[tokio::test]
    async fn test_task_exits_when_engine_not_running() {
        let (scheduler, engine, _rx) = create_scheduler(Settings::default());
        engine.lock().await.start().unwrap();
        scheduler.schedule();
        engine.lock().await.pause().unwrap();

        sleep(Duration::from_millis(50)).await;
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test]
    async fn test_completion_advances_after_delay() {
        let (scheduler, engine, mut rx) = create_scheduler(Settings::default());
        {
            let mut engine = engine.lock().await;
            engine.start().unwrap();
            engine.set_remaining_seconds(2);
        }
        scheduler.schedule();

        sleep(Duration::from_millis(150)).await;
        {
            let engine = engine.lock().await;
            assert_eq!(engine.status(), TimerStatus::Idle);
            assert_eq!(engine.mode(), TimerMode::ShortBreak);
            assert_eq!(engine.completed_work(), 1);
        }
        assert!(!scheduler.is_scheduled());

        let mut saw_completion = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, TimerEvent::SessionCompleted { .. }) {
                saw_completion = true;
            }
        }
        assert!(saw_completion);
    }

    #[tokio::test]
    async fn test_auto_started_interval_keeps_ticking() {
        let settings = Settings {
            auto_start_breaks: true,
            ..Settings::default()
        };
        let (scheduler, engine, _rx) = create_scheduler(settings);
        {
            let mut engine = engine.lock().await;
            engine.start().unwrap();
            engine.set_remaining_seconds(1);
        }
        scheduler.schedule();

        sleep(Duration::from_millis(150)).await;
        let engine = engine.lock().await;
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
        assert_eq!(engine.status(), TimerStatus::Running);
        assert!(engine.remaining_seconds() < 300);
    }
}
