//! Sign-in against Supabase Auth (GoTrue) and the saved sign-in on disk.
//!
//! `login` stores the returned tokens as one JSON document in the data
//! directory; the daemon reads it at startup and renews the access token
//! with the refresh token whenever it expires.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use super::hosted::{build_http_client, check_config, parse_json, transport_error};
use super::local::{read_document, remove_document, write_document};
use super::HostedConfig;

/// Document key of the saved sign-in.
pub const SESSION_KEY: &str = "auth_session";

/// Access tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// The user a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens of a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token, seconds since the epoch
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    /// True once the access token expires within the safety margin.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECONDS <= now.timestamp()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| Utc::now().timestamp() + self.expires_in);
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Projects that confirm accounts automatically answer a sign-up with a
/// session; the others only return the new user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

/// Result of [`AuthClient::sign_up`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// The account exists but the email address must be confirmed first
    ConfirmationRequired(AuthUser),
}

#[derive(Debug, Deserialize)]
struct AuthErrorBody {
    #[serde(default, alias = "msg", alias = "message")]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the `/auth/v1` endpoints of a Supabase project.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http_client: Client,
    base_url: String,
    anon_key: String,
}

impl AuthClient {
    /// # Errors
    ///
    /// [`StoreError::NotConfigured`] for empty or placeholder values.
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, StoreError> {
        check_config(base_url, anon_key)?;
        Ok(Self {
            http_client: build_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    pub fn from_config(hosted: &HostedConfig) -> Result<Self, StoreError> {
        Self::new(
            hosted.url.as_deref().unwrap_or_default(),
            hosted.anon_key.as_deref().unwrap_or_default(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Signs in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, StoreError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self.post("token", Some("password"), &body, None).await?;
        let token: TokenResponse = parse_json(response).await?;

        tracing::info!(user_id = %token.user.id, "Signed in");
        Ok(token.into_session())
    }

    /// Creates an account.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, StoreError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self.post("signup", None, &body, None).await?;
        let answer: SignUpResponse = parse_json(response).await?;

        match answer {
            SignUpResponse::Session(token) => {
                tracing::info!(user_id = %token.user.id, "Signed up");
                Ok(SignUpOutcome::SignedIn(token.into_session()))
            }
            SignUpResponse::User(user) => {
                tracing::info!(user_id = %user.id, "Signed up, confirmation pending");
                Ok(SignUpOutcome::ConfirmationRequired(user))
            }
        }
    }

    /// Exchanges a refresh token for a new session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, StoreError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self.post("token", Some("refresh_token"), &body, None).await?;
        let token: TokenResponse = parse_json(response).await?;

        tracing::debug!(user_id = %token.user.id, "Access token refreshed");
        Ok(token.into_session())
    }

    /// Revokes the session's refresh tokens on the server.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), StoreError> {
        self.post("logout", None, &serde_json::json!({}), Some(access_token))
            .await
            .map(|_| ())
    }

    async fn post(
        &self,
        endpoint: &str,
        grant_type: Option<&str>,
        body: &serde_json::Value,
        access_token: Option<&str>,
    ) -> Result<Response, StoreError> {
        let url = format!("{}/auth/v1/{}", self.base_url, endpoint);
        let mut request = self
            .http_client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(body);
        if let Some(grant_type) = grant_type {
            request = request.query(&[("grant_type", grant_type)]);
        }
        if let Some(token) = access_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            let message = serde_json::from_str::<AuthErrorBody>(&text)
                .ok()
                .and_then(|body| body.error_description.or(body.error))
                .unwrap_or_else(|| status.to_string());
            return Err(StoreError::AuthFailed(message));
        }

        tracing::error!(status = %status, body = %text, "Unexpected response from auth endpoint");
        Err(StoreError::InvalidResponse(format!(
            "unexpected status {status}: {text}"
        )))
    }
}

/// The saved sign-in, kept next to the local store documents.
#[derive(Debug, Clone)]
pub struct SessionFile {
    dir: PathBuf,
}

impl SessionFile {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", SESSION_KEY))
    }

    pub async fn load(&self) -> Result<Option<AuthSession>, StoreError> {
        read_document(&self.dir, SESSION_KEY).await
    }

    /// Writes the session, readable by the owner only.
    pub async fn save(&self, session: &AuthSession) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                key: SESSION_KEY.to_string(),
                source,
            })?;
        write_document(&self.dir, SESSION_KEY, session).await?;
        restrict_permissions(&self.path()).await
    }

    /// Deletes the saved session. Returns false if there was none.
    pub async fn remove(&self) -> Result<bool, StoreError> {
        remove_document(&self.dir, SESSION_KEY).await
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|source| StoreError::Io {
            key: SESSION_KEY.to_string(),
            source,
        })
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}
