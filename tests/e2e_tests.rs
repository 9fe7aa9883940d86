//! End-to-End Tests for the Pomodoro Tracker.
//!
//! These tests walk through complete user workflows:
//! - Full work/break cycles with the long break after four pomodoros
//! - Auto-start behavior
//! - Stop and reset during a cycle
//! - Statistics over a realistic session history

use std::sync::Arc;

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

use pomodoro_tracker::daemon::recorder::{ErrorSlot, SessionRecorder};
use pomodoro_tracker::daemon::timer::{TickOutcome, TimerEngine, TimerEvent};
use pomodoro_tracker::notification::MockNotifier;
use pomodoro_tracker::stats::{StatisticsReport, UNKNOWN_CATEGORY_NAME};
use pomodoro_tracker::store::{LocalStore, Store};
use pomodoro_tracker::types::{
    default_categories, Session, Settings, TimerMode, TimerStatus,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Creates a fast configuration (1-minute intervals, 2-minute long break).
fn create_fast_settings() -> Settings {
    Settings {
        work_duration: 60,
        short_break_duration: 60,
        long_break_duration: 120,
        ..Settings::default()
    }
}

fn create_engine(settings: Settings) -> (TimerEngine, mpsc::UnboundedReceiver<TimerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TimerEngine::new(settings, tx), rx)
}

/// Ticks the running interval down to zero.
fn run_to_completion(engine: &mut TimerEngine) {
    let mut outcome = TickOutcome::Counting;
    while outcome == TickOutcome::Counting {
        outcome = engine.tick();
    }
    assert_eq!(outcome, TickOutcome::Completed);
}

/// Starts, completes and advances one interval. Returns the next mode.
fn complete_interval(engine: &mut TimerEngine) -> TimerMode {
    if engine.status() == TimerStatus::Idle {
        engine.start().unwrap();
    }
    run_to_completion(engine);
    engine.advance();
    engine.mode()
}

fn session(
    id: &str,
    mode: TimerMode,
    duration: u32,
    category: Option<&str>,
    started_at: DateTime<Utc>,
) -> Session {
    Session {
        id: id.to_string(),
        user_id: None,
        category_id: category.map(str::to_string),
        mode,
        duration,
        completed: true,
        started_at,
        completed_at: Some(started_at + Duration::seconds(i64::from(duration))),
        created_at: started_at,
        updated_at: started_at,
    }
}

fn at(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
}

// ============================================================================
// Complete Cycles
// ============================================================================

#[test]
fn test_complete_pomodoro_cycle() {
    let (mut engine, _rx) = create_engine(create_fast_settings());

    // Work -> short break, waits for the user
    assert_eq!(complete_interval(&mut engine), TimerMode::ShortBreak);
    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(engine.remaining_seconds(), 60);
    assert_eq!(engine.completed_work(), 1);

    // Break -> work, counter untouched
    assert_eq!(complete_interval(&mut engine), TimerMode::Work);
    assert_eq!(engine.completed_work(), 1);
}

#[test]
fn test_long_break_after_four_pomodoros() {
    let (mut engine, _rx) = create_engine(Settings::default());

    let mut next_modes = Vec::new();
    let mut counters = Vec::new();
    for _ in 0..4 {
        next_modes.push(complete_interval(&mut engine));
        counters.push(engine.completed_work());
        if engine.mode().is_break() && engine.completed_work() < 4 {
            complete_interval(&mut engine);
        }
    }

    assert_eq!(
        next_modes,
        vec![
            TimerMode::ShortBreak,
            TimerMode::ShortBreak,
            TimerMode::ShortBreak,
            TimerMode::LongBreak
        ]
    );
    assert_eq!(counters, vec![1, 2, 3, 4]);
    assert_eq!(engine.remaining_seconds(), 900);

    // The cycle continues with work and the counter keeps growing
    assert_eq!(complete_interval(&mut engine), TimerMode::Work);
    assert_eq!(complete_interval(&mut engine), TimerMode::ShortBreak);
    assert_eq!(engine.completed_work(), 5);
}

#[test]
fn test_auto_start_runs_whole_cycle_without_input() {
    let settings = Settings {
        auto_start_breaks: true,
        auto_start_pomodoros: true,
        ..create_fast_settings()
    };
    let (mut engine, _rx) = create_engine(settings);
    engine.start().unwrap();

    for expected in [TimerMode::ShortBreak, TimerMode::Work] {
        run_to_completion(&mut engine);
        assert!(engine.advance());
        assert_eq!(engine.mode(), expected);
        assert_eq!(engine.status(), TimerStatus::Running);
    }
}

#[test]
fn test_auto_start_breaks_only() {
    let settings = Settings {
        auto_start_breaks: true,
        ..create_fast_settings()
    };
    let (mut engine, _rx) = create_engine(settings);
    engine.start().unwrap();

    run_to_completion(&mut engine);
    assert!(engine.advance());
    assert_eq!(engine.status(), TimerStatus::Running);

    run_to_completion(&mut engine);
    assert!(!engine.advance());
    assert_eq!(engine.mode(), TimerMode::Work);
    assert_eq!(engine.status(), TimerStatus::Idle);
}

// ============================================================================
// Stop and Reset Flows
// ============================================================================

#[test]
fn test_pause_resume_keeps_remaining_time() {
    let (mut engine, _rx) = create_engine(create_fast_settings());
    engine.start().unwrap();
    for _ in 0..10 {
        engine.tick();
    }
    engine.pause().unwrap();
    assert_eq!(engine.tick(), TickOutcome::Idle);
    assert_eq!(engine.remaining_seconds(), 50);

    engine.start().unwrap();
    engine.tick();
    assert_eq!(engine.remaining_seconds(), 49);
}

#[test]
fn test_stop_during_completion_delay_keeps_cycle_position() {
    let (mut engine, _rx) = create_engine(create_fast_settings());
    engine.start().unwrap();
    run_to_completion(&mut engine);
    assert_eq!(engine.status(), TimerStatus::Completed);

    engine.stop();

    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(engine.mode(), TimerMode::ShortBreak);
    assert_eq!(engine.completed_work(), 1);
    // The delayed advance finds nothing left to do
    assert!(!engine.advance());
    assert_eq!(engine.mode(), TimerMode::ShortBreak);
}

#[test]
fn test_reset_mid_cycle() {
    let (mut engine, _rx) = create_engine(create_fast_settings());
    complete_interval(&mut engine);
    complete_interval(&mut engine);
    engine.start().unwrap();
    engine.tick();

    engine.reset();

    assert_eq!(engine.status(), TimerStatus::Idle);
    assert_eq!(engine.mode(), TimerMode::Work);
    assert_eq!(engine.completed_work(), 0);
    assert_eq!(engine.remaining_seconds(), 60);
}

// ============================================================================
// Recording
// ============================================================================

#[tokio::test]
async fn test_every_completion_is_recorded_once() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(Store::Local(LocalStore::open(dir.path()).await.unwrap()));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = Arc::new(Mutex::new(TimerEngine::new(create_fast_settings(), tx)));
    let recorder = SessionRecorder::new(
        Arc::clone(&engine),
        Arc::clone(&store),
        Arc::new(MockNotifier::granted()),
        Arc::new(ErrorSlot::default()),
    );

    {
        let mut engine = engine.lock().await;
        engine.set_category(Some("study".to_string()));
        for _ in 0..4 {
            complete_interval(&mut engine);
        }
    }

    // Feed the recorder the events produced so far
    while let Ok(event) = rx.try_recv() {
        recorder.handle(event).await;
    }

    let sessions = store.list_sessions().await.unwrap();
    let modes: Vec<TimerMode> = sessions.iter().map(|s| s.mode).collect();
    assert_eq!(
        modes,
        vec![
            TimerMode::Work,
            TimerMode::ShortBreak,
            TimerMode::Work,
            TimerMode::ShortBreak
        ]
    );
    assert!(sessions
        .iter()
        .all(|s| s.completed && s.category_id.as_deref() == Some("study")));
    assert_eq!(sessions[1].duration, 60);
}

// ============================================================================
// Statistics Scenarios
// ============================================================================

#[test]
fn test_statistics_over_history() {
    // 2024-05-15 is a Wednesday
    let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    let day = |offset: u64| today - Days::new(offset);

    let sessions = vec![
        session("1", TimerMode::Work, 1500, Some("coding"), at(day(0), 9)),
        session("2", TimerMode::ShortBreak, 300, Some("coding"), at(day(0), 10)),
        session("3", TimerMode::Work, 1500, Some("writing"), at(day(1), 9)),
        session("4", TimerMode::Work, 1500, Some("deleted"), at(day(2), 9)),
        // Gap on day 3 ends the streak
        session("5", TimerMode::Work, 1500, Some("coding"), at(day(4), 9)),
        // Outside the daily window but still in the totals
        session("6", TimerMode::Work, 1500, None, at(day(400), 9)),
    ];

    let report = StatisticsReport::compute(&sessions, &default_categories(), today, &Utc);

    assert_eq!(report.daily_stats.len(), 365);
    assert_eq!(report.daily_stats.last().unwrap().date, today);
    assert_eq!(report.daily_stats.last().unwrap().sessions, 2);
    assert_eq!(report.daily_stats.last().unwrap().work_time, 1500);

    assert_eq!(report.total_sessions, 5);
    assert_eq!(report.total_work_time, 5 * 1500);
    assert_eq!(report.current_streak, 3);

    // This week started on Sunday 2024-05-12: days 0..=3
    let this_week = report.weekly_stats.last().unwrap();
    assert_eq!(this_week.week, NaiveDate::from_ymd_opt(2024, 5, 12).unwrap());
    assert_eq!(this_week.total_sessions, 4);
    assert!((this_week.average_sessions_per_day - 4.0 / 7.0).abs() < 1e-9);

    let names: Vec<&str> = report
        .category_stats
        .iter()
        .map(|c| c.category_name.as_str())
        .collect();
    assert_eq!(names, vec!["Coding", "Writing", UNKNOWN_CATEGORY_NAME]);
    assert_eq!(report.category_stats[0].sessions, 3);
    assert_eq!(report.category_stats[2].category_id, "deleted");
}

#[test]
fn test_statistics_with_no_sessions() {
    let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let report = StatisticsReport::compute(&[], &default_categories(), today, &Utc);

    assert_eq!(report.daily_stats.len(), 365);
    assert!(report.daily_stats.iter().all(|d| d.sessions == 0));
    assert!(report
        .daily_stats
        .windows(2)
        .all(|w| w[0].date < w[1].date));
    assert_eq!(report.total_sessions, 0);
    assert_eq!(report.current_streak, 0);
    assert!(report.category_stats.is_empty());
}
