//! Integration tests for Daemon-CLI IPC communication.
//!
//! These tests run the real IPC server, request handler, engine and local
//! store, and talk to them through the CLI's `IpcClient`:
//! - Timer commands and status over the socket
//! - Settings and category management
//! - Completed sessions flowing into statistics

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};

use pomodoro_tracker::cli::client::IpcClient;
use pomodoro_tracker::daemon::ipc::{IpcServer, RequestHandler};
use pomodoro_tracker::daemon::recorder::{ErrorSlot, SessionRecorder};
use pomodoro_tracker::daemon::scheduler::TickScheduler;
use pomodoro_tracker::daemon::timer::{TickOutcome, TimerEngine, TimerEvent};
use pomodoro_tracker::notification::MockNotifier;
use pomodoro_tracker::store::{LocalStore, Store};
use pomodoro_tracker::types::{
    NewCategory, ResponseData, Settings, SettingsPatch, TimerMode, TimerStatus,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// A daemon assembled in-process on a temporary socket and data directory.
struct TestDaemon {
    _dir: TempDir,
    socket_path: PathBuf,
    engine: Arc<Mutex<TimerEngine>>,
    store: Arc<Store>,
    server_task: JoinHandle<()>,
    events: Option<mpsc::UnboundedReceiver<TimerEvent>>,
}

impl TestDaemon {
    async fn start(settings: Settings) -> Self {
        let dir = TempDir::new().unwrap();
        let socket_path = dir.path().join("integration_test.sock");
        let store = Arc::new(Store::Local(
            LocalStore::open(dir.path().join("data")).await.unwrap(),
        ));

        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::new(Mutex::new(TimerEngine::new(settings, tx)));
        let scheduler = Arc::new(TickScheduler::new(Arc::clone(&engine)));
        let handler = Arc::new(RequestHandler::new(
            Arc::clone(&engine),
            scheduler,
            Arc::clone(&store),
            Arc::new(ErrorSlot::default()),
        ));

        let server = IpcServer::new(&socket_path).unwrap();
        let server_task = tokio::spawn(async move {
            let _ = server.run(handler).await;
        });

        Self {
            _dir: dir,
            socket_path,
            engine,
            store,
            server_task,
            events: Some(rx),
        }
    }

    fn client(&self) -> IpcClient {
        IpcClient::with_socket_path(self.socket_path.clone())
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        self.server_task.abort();
    }
}

fn short_settings() -> Settings {
    Settings {
        work_duration: 60,
        short_break_duration: 60,
        long_break_duration: 120,
        ..Settings::default()
    }
}

// ============================================================================
// Timer Commands
// ============================================================================

#[tokio::test]
async fn test_timer_start_via_ipc() {
    let daemon = TestDaemon::start(Settings::default()).await;
    let client = daemon.client();

    let response = client.start(Some("coding".to_string())).await.unwrap();

    assert_eq!(response.message, "Timer started");
    let snapshot = response.timer().unwrap();
    assert_eq!(snapshot.state, TimerStatus::Running);
    assert_eq!(snapshot.mode, TimerMode::Work);
    assert_eq!(snapshot.category_id.as_deref(), Some("coding"));
    assert_eq!(daemon.engine.lock().await.status(), TimerStatus::Running);
}

#[tokio::test]
async fn test_timer_pause_via_ipc() {
    let daemon = TestDaemon::start(Settings::default()).await;
    let client = daemon.client();

    client.start(None).await.unwrap();
    let response = client.pause().await.unwrap();

    assert_eq!(response.timer().unwrap().state, TimerStatus::Paused);
}

#[tokio::test]
async fn test_invalid_transition_is_reported() {
    let daemon = TestDaemon::start(Settings::default()).await;
    let client = daemon.client();

    let err = client.pause().await.unwrap_err();
    assert_eq!(err.to_string(), "cannot pause while the timer is idle");
    assert_eq!(daemon.engine.lock().await.status(), TimerStatus::Idle);
}

#[tokio::test]
async fn test_status_via_ipc() {
    let daemon = TestDaemon::start(Settings::default()).await;
    let response = daemon.client().status().await.unwrap();

    let snapshot = response.timer().unwrap();
    assert_eq!(snapshot.state, TimerStatus::Idle);
    assert_eq!(snapshot.remaining_seconds, 1500);
    assert_eq!(snapshot.total_seconds, 1500);
    assert_eq!(snapshot.store.as_deref(), Some("local"));
    assert_eq!(snapshot.last_error, None);
}

#[tokio::test]
async fn test_stop_and_reset_via_ipc() {
    let daemon = TestDaemon::start(Settings::default()).await;
    let client = daemon.client();

    client.start(None).await.unwrap();
    let stopped = client.stop().await.unwrap();
    assert_eq!(stopped.timer().unwrap().state, TimerStatus::Idle);
    assert_eq!(stopped.timer().unwrap().remaining_seconds, 1500);

    let reset = client.reset().await.unwrap();
    let snapshot = reset.timer().unwrap();
    assert_eq!(snapshot.mode, TimerMode::Work);
    assert_eq!(snapshot.completed_work, 0);
}

#[tokio::test]
async fn test_concurrent_status_requests() {
    let daemon = TestDaemon::start(Settings::default()).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let client = daemon.client();
        handles.push(tokio::spawn(async move { client.status().await }));
    }

    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert!(response.is_success());
    }
}

// ============================================================================
// Settings and Categories
// ============================================================================

#[tokio::test]
async fn test_update_settings_via_ipc() {
    let daemon = TestDaemon::start(Settings::default()).await;
    let client = daemon.client();

    let response = client
        .update_settings(SettingsPatch {
            work_duration: Some(50 * 60),
            auto_start_breaks: Some(true),
            ..SettingsPatch::default()
        })
        .await
        .unwrap();
    assert_eq!(response.message, "Settings updated");

    let settings = match client.settings().await.unwrap().data {
        Some(ResponseData::Settings(settings)) => settings,
        other => panic!("Expected settings, got {:?}", other),
    };
    assert_eq!(settings.work_duration, 3000);
    assert!(settings.auto_start_breaks);
    assert_eq!(settings.short_break_duration, 300);

    // The idle countdown picks up the new work duration
    let status = client.status().await.unwrap();
    assert_eq!(status.timer().unwrap().remaining_seconds, 3000);
}

#[tokio::test]
async fn test_update_settings_out_of_range_via_ipc() {
    let daemon = TestDaemon::start(Settings::default()).await;

    let err = daemon
        .client()
        .update_settings(SettingsPatch {
            long_break_duration: Some(61 * 60),
            ..SettingsPatch::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Long break must be between 1 and 60 minutes");
    assert_eq!(daemon.store.get_settings().await.unwrap(), Settings::default());
}

#[tokio::test]
async fn test_categories_via_ipc() {
    let daemon = TestDaemon::start(Settings::default()).await;
    let client = daemon.client();

    client
        .create_category(NewCategory {
            name: "Music".to_string(),
            color: "#123456".to_string(),
            icon: Some("🎵".to_string()),
        })
        .await
        .unwrap();

    let categories = match client.categories().await.unwrap().data {
        Some(ResponseData::Categories(categories)) => categories,
        other => panic!("Expected categories, got {:?}", other),
    };
    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Work", "Study", "Coding", "Writing", "Reading", "Exercise", "Music"]
    );
    assert!(categories[6].id.starts_with("custom_"));
}

// ============================================================================
// Sessions and Statistics
// ============================================================================

#[tokio::test]
async fn test_completed_interval_appears_in_statistics() {
    let mut daemon = TestDaemon::start(short_settings()).await;

    let recorder = SessionRecorder::new(
        Arc::clone(&daemon.engine),
        Arc::clone(&daemon.store),
        Arc::new(MockNotifier::granted()),
        Arc::new(ErrorSlot::default()),
    );
    let events = daemon.events.take().unwrap();
    let recorder_task = tokio::spawn(recorder.run(events));

    // Drive the countdown directly instead of waiting a real minute
    {
        let mut engine = daemon.engine.lock().await;
        engine.set_category(Some("coding".to_string()));
        engine.start().unwrap();
        let mut outcome = TickOutcome::Counting;
        for _ in 0..60 {
            outcome = engine.tick();
        }
        assert_eq!(outcome, TickOutcome::Completed);
        assert!(!engine.advance());
        assert_eq!(engine.mode(), TimerMode::ShortBreak);
    }

    // Wait for the recorder to persist the session
    timeout(Duration::from_secs(5), async {
        while daemon.store.list_sessions().await.unwrap().is_empty() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session was not recorded");

    let report = match daemon.client().stats().await.unwrap().data {
        Some(ResponseData::Statistics(report)) => report,
        other => panic!("Expected statistics, got {:?}", other),
    };
    assert_eq!(report.total_sessions, 1);
    assert_eq!(report.total_work_time, 60);
    assert_eq!(report.current_streak, 1);
    assert_eq!(report.category_stats.len(), 1);
    assert_eq!(report.category_stats[0].category_name, "Coding");
    assert_eq!(report.daily_stats.len(), 365);

    recorder_task.abort();
}
