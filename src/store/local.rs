//! Local JSON document store for anonymous use.
//!
//! Each key is one JSON file in the data directory. Writes go to a
//! temporary sibling first and are renamed into place, so a crash never
//! leaves a half-written document behind.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use super::error::StoreError;
use crate::types::{
    default_categories, Category, NewCategory, NewSession, Session, Settings, SettingsPatch,
};

/// Document key for the session list.
pub const SESSIONS_KEY: &str = "pomodoro_sessions";

/// Document key for the settings singleton.
pub const SETTINGS_KEY: &str = "pomodoro_settings";

/// Document key for custom categories.
pub const CATEGORIES_KEY: &str = "pomodoro_categories";

/// Only the most recent sessions are kept locally.
pub const MAX_LOCAL_SESSIONS: usize = 100;

/// File-backed store used when no hosted backend is available.
#[derive(Debug)]
pub struct LocalStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                key: dir.display().to_string(),
                source,
            })?;

        tracing::debug!(dir = %dir.display(), "Local store opened");

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        read_document(&self.dir, key).await
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        write_document(&self.dir, key, value).await
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    /// Appends a completed session, dropping the oldest past the cap.
    pub async fn create_session(&self, new: NewSession) -> Result<Session, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut sessions: Vec<Session> = self.read(SESSIONS_KEY).await?.unwrap_or_default();
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            category_id: new.category_id.clone(),
            mode: new.mode,
            duration: new.duration,
            completed: true,
            started_at: new.started_at(),
            completed_at: Some(new.completed_at),
            created_at: now,
            updated_at: now,
        };
        sessions.push(session.clone());

        if sessions.len() > MAX_LOCAL_SESSIONS {
            let excess = sessions.len() - MAX_LOCAL_SESSIONS;
            sessions.drain(..excess);
        }

        self.write(SESSIONS_KEY, &sessions).await?;
        tracing::debug!(id = %session.id, mode = session.mode.as_str(), "Session stored locally");

        Ok(session)
    }

    /// Lists completed sessions in insertion order.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let sessions: Vec<Session> = self.read(SESSIONS_KEY).await?.unwrap_or_default();
        Ok(sessions.into_iter().filter(|s| s.completed).collect())
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Reads settings, writing the defaults on first use.
    pub async fn get_settings(&self) -> Result<Settings, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.load_or_init_settings().await
    }

    /// Merges `patch` into the stored settings and returns the result.
    pub async fn upsert_settings(&self, patch: &SettingsPatch) -> Result<Settings, StoreError> {
        let _guard = self.write_lock.lock().await;

        let current = self.load_or_init_settings().await?;
        let updated = patch.apply_to(&current);
        self.write(SETTINGS_KEY, &updated).await?;

        Ok(updated)
    }

    async fn load_or_init_settings(&self) -> Result<Settings, StoreError> {
        if let Some(settings) = self.read(SETTINGS_KEY).await? {
            return Ok(settings);
        }
        let settings = Settings::default();
        self.write(SETTINGS_KEY, &settings).await?;
        Ok(settings)
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    /// Default categories followed by custom ones in creation order.
    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let custom: Vec<Category> = self.read(CATEGORIES_KEY).await?.unwrap_or_default();
        let mut categories = default_categories();
        categories.extend(custom);
        Ok(categories)
    }

    /// Creates a custom category with a time-based id.
    pub async fn create_category(&self, fields: NewCategory) -> Result<Category, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut custom: Vec<Category> = self.read(CATEGORIES_KEY).await?.unwrap_or_default();
        let now = Utc::now();

        let mut millis = now.timestamp_millis();
        while custom.iter().any(|c| c.id == format!("custom_{}", millis)) {
            millis += 1;
        }

        let category = Category {
            id: format!("custom_{}", millis),
            name: fields.name,
            color: fields.color,
            icon: fields.icon,
            user_id: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        custom.push(category.clone());
        self.write(CATEGORIES_KEY, &custom).await?;

        Ok(category)
    }
}

// ============================================================================
// Documents
// ============================================================================

fn document_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", key))
}

/// Reads the JSON document `key` in `dir`, or `None` if it does not exist.
pub(super) async fn read_document<T: DeserializeOwned>(
    dir: &Path,
    key: &str,
) -> Result<Option<T>, StoreError> {
    let bytes = match tokio::fs::read(document_path(dir, key)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                key: key.to_string(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })
}

/// Replaces the JSON document `key` in `dir` through a temporary sibling.
pub(super) async fn write_document<T: Serialize>(
    dir: &Path,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let path = document_path(dir, key);
    let tmp_path = dir.join(format!(".{}.json.tmp", key));
    let io_err = |source| StoreError::Io {
        key: key.to_string(),
        source,
    };

    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Corrupt {
        key: key.to_string(),
        source,
    })?;
    tokio::fs::write(&tmp_path, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp_path, &path).await.map_err(io_err)?;

    Ok(())
}

/// Deletes the document `key` in `dir`. Returns false if there was none.
pub(super) async fn remove_document(dir: &Path, key: &str) -> Result<bool, StoreError> {
    match tokio::fs::remove_file(document_path(dir, key)).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Io {
            key: key.to_string(),
            source,
        }),
    }
}
