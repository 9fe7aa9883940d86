//! Periodic reachability check of the hosted store.
//!
//! An outage is reported through the daemon's last error so `status` shows
//! it, and cleared again once the backend answers. The local store needs no
//! checking and the monitor returns immediately for it.

use std::sync::Arc;

use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

use super::recorder::ErrorSlot;
use crate::store::{Store, StoreKind};

/// Time between two checks.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

const UNREACHABLE_PREFIX: &str = "Hosted store unreachable";

/// Watches the hosted store's connectivity.
pub struct ConnectionMonitor {
    store: Arc<Store>,
    last_error: Arc<ErrorSlot>,
    interval: Duration,
}

impl ConnectionMonitor {
    pub fn new(store: Arc<Store>, last_error: Arc<ErrorSlot>) -> Self {
        Self::with_interval(store, last_error, HEALTH_CHECK_INTERVAL)
    }

    pub fn with_interval(store: Arc<Store>, last_error: Arc<ErrorSlot>, interval: Duration) -> Self {
        Self {
            store,
            last_error,
            interval,
        }
    }

    /// Checks once and updates the last error. Returns true if the store
    /// is reachable.
    pub async fn check_once(&self) -> bool {
        match self.store.check_connection().await {
            Ok(()) => {
                self.last_error
                    .clear_if(|message| message.starts_with(UNREACHABLE_PREFIX));
                true
            }
            Err(e) => {
                let was_reachable = !self
                    .last_error
                    .get()
                    .is_some_and(|message| message.starts_with(UNREACHABLE_PREFIX));
                if was_reachable {
                    tracing::warn!(error = %e, suggestion = e.suggestion(), "Hosted store unreachable");
                }
                self.last_error.set(format!("{}: {}", UNREACHABLE_PREFIX, e));
                false
            }
        }
    }

    /// Checks every interval, starting one interval from now. Runs until
    /// the task is aborted.
    pub async fn run(self) {
        if self.store.kind() == StoreKind::Local {
            return;
        }

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.check_once().await {
                tracing::debug!("Hosted store reachable");
            }
        }
    }
}
