//! Hosted store backed by Supabase (PostgREST + GoTrue).
//!
//! The access token's user is resolved once at connect time through
//! `/auth/v1/user`; every table request is then scoped to that user id.
//! A store opened from a saved sign-in renews its access token when the
//! backend rejects it and retries the request once.

use std::sync::RwLock;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::auth::{AuthClient, AuthSession, SessionFile};
use super::error::StoreError;
use crate::types::{Category, NewCategory, NewSession, Session, Settings, SettingsPatch, TimerMode};

/// Timeout for every backend request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// URL used by unconfigured deployments.
pub const PLACEHOLDER_URL: &str = "https://placeholder.supabase.co";

/// Anon key used by unconfigured deployments.
pub const PLACEHOLDER_KEY: &str = "placeholder-key";

const SESSIONS_TABLE: &str = "pomodoro_sessions";
const SETTINGS_TABLE: &str = "user_settings";
const CATEGORIES_TABLE: &str = "categories";

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct SessionInsert<'a> {
    user_id: &'a str,
    category_id: Option<&'a str>,
    #[serde(rename = "type")]
    mode: TimerMode,
    duration: u32,
    completed: bool,
    started_at: chrono::DateTime<Utc>,
    completed_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SettingsInsert<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    settings: &'a Settings,
}

#[derive(Debug, Serialize)]
struct CategoryInsert<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    fields: &'a NewCategory,
}

/// Renews the access token of a saved sign-in.
#[derive(Debug)]
struct Refresher {
    auth: AuthClient,
    file: SessionFile,
    /// Held while a refresh is in flight
    refresh_token: Mutex<String>,
}

/// Client for the user's tables on a Supabase project.
#[derive(Debug)]
pub struct HostedStore {
    http_client: Client,
    base_url: String,
    anon_key: String,
    access_token: RwLock<String>,
    refresher: Option<Refresher>,
    user_id: String,
}

impl HostedStore {
    /// Validates the configuration and resolves the user of a fixed access
    /// token. The token is never renewed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotConfigured`] for empty or placeholder values
    /// - [`StoreError::Unauthorized`] if the access token is rejected
    /// - [`StoreError::Timeout`] / [`StoreError::Unavailable`] on network failure
    pub async fn connect(
        base_url: &str,
        anon_key: &str,
        access_token: &str,
    ) -> Result<Self, StoreError> {
        check_config(base_url, anon_key)?;
        if access_token.is_empty() {
            return Err(StoreError::NotConfigured("no signed-in user".to_string()));
        }

        Self::open(base_url, anon_key, access_token.to_string(), None).await
    }

    /// Opens the store for a saved sign-in, refreshing the session first if
    /// its access token has expired. Renewed sessions are written back to
    /// `file`.
    ///
    /// # Errors
    ///
    /// [`StoreError::AuthFailed`] if the refresh token is no longer accepted,
    /// otherwise as [`HostedStore::connect`].
    pub async fn connect_with_session(
        auth: AuthClient,
        session: AuthSession,
        file: SessionFile,
    ) -> Result<Self, StoreError> {
        let session = if session.is_expired(Utc::now()) {
            tracing::info!(user_id = %session.user.id, "Saved access token expired, refreshing");
            let renewed = auth.refresh(&session.refresh_token).await?;
            file.save(&renewed).await?;
            renewed
        } else {
            session
        };

        let base_url = auth.base_url().to_string();
        let anon_key = auth.anon_key().to_string();
        let refresher = Refresher {
            auth,
            file,
            refresh_token: Mutex::new(session.refresh_token),
        };
        Self::open(&base_url, &anon_key, session.access_token, Some(refresher)).await
    }

    async fn open(
        base_url: &str,
        anon_key: &str,
        access_token: String,
        refresher: Option<Refresher>,
    ) -> Result<Self, StoreError> {
        let mut store = Self {
            http_client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: RwLock::new(access_token),
            refresher,
            user_id: String::new(),
        };
        store.user_id = store.fetch_user_id().await?;

        tracing::info!(user_id = %store.user_id, "Connected to hosted store");
        Ok(store)
    }

    /// The id of the user every request is scoped to.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Base URL of the project, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Checks that the backend is reachable and still accepts the user.
    pub async fn check_connection(&self) -> Result<(), StoreError> {
        self.fetch_user_id().await.map(|_| ())
    }

    async fn fetch_user_id(&self) -> Result<String, StoreError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let response = self
            .send(|token| self.request(Method::GET, &url, token))
            .await?;
        let user: UserResponse = parse_json(response).await?;
        Ok(user.id)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn user_filter(&self) -> String {
        format!("eq.{}", self.user_id)
    }

    fn current_token(&self) -> String {
        self.access_token
            .read()
            .map(|token| token.clone())
            .unwrap_or_default()
    }

    fn request(&self, method: Method, url: &str, token: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
    }

    /// Sends the request made by `build` with the current access token. A
    /// rejected token is renewed once and the request rebuilt and resent.
    async fn send<F>(&self, build: F) -> Result<Response, StoreError>
    where
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.current_token();
        match send_request(build(token.as_str())).await {
            Err(StoreError::Unauthorized) if self.refresher.is_some() => {
                self.renew_token(&token).await?;
                let renewed = self.current_token();
                send_request(build(renewed.as_str())).await
            }
            other => other,
        }
    }

    async fn renew_token(&self, rejected: &str) -> Result<(), StoreError> {
        let Some(refresher) = &self.refresher else {
            return Err(StoreError::Unauthorized);
        };

        let mut refresh_token = refresher.refresh_token.lock().await;
        // Another request renewed it while we waited
        if self.current_token() != rejected {
            return Ok(());
        }

        tracing::info!(user_id = %self.user_id, "Access token rejected, refreshing");
        let session = refresher.auth.refresh(&refresh_token).await?;
        refresher.file.save(&session).await?;

        *refresh_token = session.refresh_token;
        if let Ok(mut token) = self.access_token.write() {
            *token = session.access_token;
        }
        Ok(())
    }

    /// Sends a write and returns the single representation row.
    async fn returning_one<T, F>(&self, build: F) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> RequestBuilder,
    {
        let response = self
            .send(|token| build(token).header("Prefer", "return=representation"))
            .await?;
        let rows: Vec<T> = parse_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidResponse("empty representation".to_string()))
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    pub async fn create_session(&self, new: NewSession) -> Result<Session, StoreError> {
        let url = self.table_url(SESSIONS_TABLE);
        let body = SessionInsert {
            user_id: &self.user_id,
            category_id: new.category_id.as_deref(),
            mode: new.mode,
            duration: new.duration,
            completed: true,
            started_at: new.started_at(),
            completed_at: new.completed_at,
        };
        let session: Session = self
            .returning_one(|token| self.request(Method::POST, &url, token).json(&body))
            .await?;

        tracing::debug!(id = %session.id, "Session stored in hosted store");
        Ok(session)
    }

    /// Completed sessions of the user, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let url = self.table_url(SESSIONS_TABLE);
        let query = [
            ("select", "*".to_string()),
            ("user_id", self.user_filter()),
            ("completed", "eq.true".to_string()),
            ("order", "started_at.desc".to_string()),
        ];
        let response = self
            .send(|token| self.request(Method::GET, &url, token).query(&query))
            .await?;
        parse_json(response).await
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Reads the user's settings row, inserting defaults if there is none.
    pub async fn get_settings(&self) -> Result<Settings, StoreError> {
        let url = self.table_url(SETTINGS_TABLE);
        let query = [("select", "*".to_string()), ("user_id", self.user_filter())];
        let response = self
            .send(|token| self.request(Method::GET, &url, token).query(&query))
            .await?;
        let rows: Vec<Settings> = parse_json(response).await?;

        if let Some(settings) = rows.into_iter().next() {
            return Ok(settings);
        }

        tracing::info!(user_id = %self.user_id, "Creating default settings row");
        let defaults = Settings::default();
        let body = SettingsInsert {
            user_id: &self.user_id,
            settings: &defaults,
        };
        self.returning_one(|token| self.request(Method::POST, &url, token).json(&body))
            .await
    }

    /// Applies `patch` to the user's settings row.
    pub async fn upsert_settings(&self, patch: &SettingsPatch) -> Result<Settings, StoreError> {
        // Make sure the row exists so the PATCH has something to update
        let current = self.get_settings().await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let url = self.table_url(SETTINGS_TABLE);
        let query = [("user_id", self.user_filter())];
        self.returning_one(|token| {
            self.request(Method::PATCH, &url, token)
                .query(&query)
                .json(patch)
        })
        .await
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    /// The user's categories plus the shared ones, oldest first.
    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let url = self.table_url(CATEGORIES_TABLE);
        let query = [
            ("select", "*".to_string()),
            (
                "or",
                format!("(user_id.eq.{},user_id.is.null)", self.user_id),
            ),
            ("order", "created_at.asc".to_string()),
        ];
        let response = self
            .send(|token| self.request(Method::GET, &url, token).query(&query))
            .await?;
        parse_json(response).await
    }

    pub async fn create_category(&self, fields: NewCategory) -> Result<Category, StoreError> {
        let url = self.table_url(CATEGORIES_TABLE);
        let body = CategoryInsert {
            user_id: &self.user_id,
            fields: &fields,
        };
        self.returning_one(|token| self.request(Method::POST, &url, token).json(&body))
            .await
    }
}

/// Rejects empty and placeholder project settings.
pub(super) fn check_config(base_url: &str, anon_key: &str) -> Result<(), StoreError> {
    if base_url.is_empty() || base_url == PLACEHOLDER_URL {
        return Err(StoreError::NotConfigured("Supabase URL missing".to_string()));
    }
    if anon_key.is_empty() || anon_key == PLACEHOLDER_KEY {
        return Err(StoreError::NotConfigured("Supabase anon key missing".to_string()));
    }
    Ok(())
}

pub(super) fn build_http_client() -> Result<Client, StoreError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| StoreError::Configuration(format!("failed to create HTTP client: {e}")))
}

pub(super) fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout(REQUEST_TIMEOUT)
    } else if e.is_connect() {
        StoreError::Unavailable(format!("connection failed: {e}"))
    } else {
        StoreError::Unavailable(format!("request failed: {e}"))
    }
}

async fn send_request(request: RequestBuilder) -> Result<Response, StoreError> {
    let response = request.send().await.map_err(transport_error)?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(StoreError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "Unexpected response from hosted store");
        return Err(StoreError::InvalidResponse(format!(
            "unexpected status {status}: {body}"
        )));
    }

    Ok(response)
}

pub(super) async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    response
        .json()
        .await
        .map_err(|e| StoreError::InvalidResponse(format!("failed to parse response: {e}")))
}
