//! Session store: persistence for sessions, settings and categories.
//!
//! The backing store is chosen once when the daemon starts. With a signed-in
//! hosted user the data lives in Supabase; otherwise it is kept in local JSON
//! documents. Callers only see [`Store`] and never branch on the variant.

pub mod auth;
pub mod error;
pub mod hosted;
pub mod local;

use std::path::{Path, PathBuf};

pub use auth::{AuthClient, AuthSession, SessionFile, SignUpOutcome};
pub use error::StoreError;
pub use hosted::HostedStore;
pub use local::LocalStore;

use crate::types::{Category, NewCategory, NewSession, Session, Settings, SettingsPatch};

/// Which backend a [`Store`] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Hosted,
    Local,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Hosted => "hosted",
            StoreKind::Local => "local",
        }
    }
}

/// Credentials for the hosted backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostedConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    /// Fixed token that takes precedence over the saved sign-in
    pub access_token: Option<String>,
}

/// The session store selected at startup.
#[derive(Debug)]
pub enum Store {
    Hosted(HostedStore),
    Local(LocalStore),
}

/// Result of [`Store::connect`].
#[derive(Debug)]
pub struct Connection {
    pub store: Store,
    /// Why the hosted backend was not used, if it was not
    pub fallback_reason: Option<String>,
}

impl Store {
    /// Connects to the hosted backend, falling back to the local store in
    /// `data_dir` if it is unconfigured or unreachable.
    ///
    /// A configured access token is used as is. Otherwise the sign-in saved
    /// by `login` in `data_dir` is used, refreshed if it has expired.
    ///
    /// # Errors
    ///
    /// Only fails if the local data directory cannot be created.
    pub async fn connect(hosted: &HostedConfig, data_dir: PathBuf) -> Result<Connection, StoreError> {
        match Self::connect_hosted(hosted, &data_dir).await {
            Ok(store) => Ok(Connection {
                store: Store::Hosted(store),
                fallback_reason: None,
            }),
            Err(e) => {
                match &e {
                    StoreError::NotConfigured(reason) => {
                        tracing::info!(reason = %reason, "Hosted store not configured, using local store");
                    }
                    other => {
                        tracing::warn!(
                            error = %other,
                            suggestion = other.suggestion(),
                            "Hosted store unavailable, falling back to local store"
                        );
                    }
                }
                let local = LocalStore::open(data_dir).await?;
                Ok(Connection {
                    store: Store::Local(local),
                    fallback_reason: Some(e.to_string()),
                })
            }
        }
    }

    async fn connect_hosted(hosted: &HostedConfig, data_dir: &Path) -> Result<HostedStore, StoreError> {
        let url = hosted.url.as_deref().unwrap_or_default();
        let anon_key = hosted.anon_key.as_deref().unwrap_or_default();

        if let Some(token) = hosted.access_token.as_deref().filter(|t| !t.is_empty()) {
            return HostedStore::connect(url, anon_key, token).await;
        }

        let auth = AuthClient::new(url, anon_key)?;
        let file = SessionFile::new(data_dir);
        match file.load().await? {
            Some(session) => HostedStore::connect_with_session(auth, session, file).await,
            None => Err(StoreError::NotConfigured(
                "no signed-in user, run 'pomodoro-tracker login'".to_string(),
            )),
        }
    }

    /// Checks that the backend is still reachable. Always succeeds for the
    /// local store.
    pub async fn check_connection(&self) -> Result<(), StoreError> {
        match self {
            Store::Hosted(store) => store.check_connection().await,
            Store::Local(_) => Ok(()),
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            Store::Hosted(_) => StoreKind::Hosted,
            Store::Local(_) => StoreKind::Local,
        }
    }

    /// Persists one completed interval.
    pub async fn create_session(&self, new: NewSession) -> Result<Session, StoreError> {
        match self {
            Store::Hosted(store) => store.create_session(new).await,
            Store::Local(store) => store.create_session(new).await,
        }
    }

    /// All completed sessions.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        match self {
            Store::Hosted(store) => store.list_sessions().await,
            Store::Local(store) => store.list_sessions().await,
        }
    }

    pub async fn get_settings(&self) -> Result<Settings, StoreError> {
        match self {
            Store::Hosted(store) => store.get_settings().await,
            Store::Local(store) => store.get_settings().await,
        }
    }

    pub async fn upsert_settings(&self, patch: &SettingsPatch) -> Result<Settings, StoreError> {
        match self {
            Store::Hosted(store) => store.upsert_settings(patch).await,
            Store::Local(store) => store.upsert_settings(patch).await,
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        match self {
            Store::Hosted(store) => store.list_categories().await,
            Store::Local(store) => store.list_categories().await,
        }
    }

    pub async fn create_category(&self, fields: NewCategory) -> Result<Category, StoreError> {
        match self {
            Store::Hosted(store) => store.create_category(fields).await,
            Store::Local(store) => store.create_category(fields).await,
        }
    }
}
