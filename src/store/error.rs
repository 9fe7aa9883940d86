//! Session store error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while reading or writing sessions, settings and
/// categories.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The hosted backend is not configured (missing or placeholder values).
    #[error("hosted backend not configured: {0}")]
    NotConfigured(String),

    /// The access token was rejected by the backend.
    #[error("unauthorized: invalid or expired access token")]
    Unauthorized,

    /// Sign-in, sign-up or token refresh was refused.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The request to the hosted backend timed out.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The hosted backend is unreachable.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something we could not use.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Reading or writing a local document failed.
    #[error("local storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// A local document holds malformed JSON.
    #[error("local document {key} is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Client setup failed.
    #[error("store configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Returns true if the error is likely transient and the next attempt may
    /// succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }

    /// Returns a user-facing suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => {
                "Set POMODORO_SUPABASE_URL and POMODORO_SUPABASE_ANON_KEY, then run 'pomodoro-tracker login'"
            }
            Self::Unauthorized => "Run 'pomodoro-tracker login' again",
            Self::AuthFailed(_) => "Check your email and password, or run 'pomodoro-tracker login' again",
            Self::Timeout(_) | Self::Unavailable(_) => "Check your network connection",
            Self::InvalidResponse(_) => "Check that the database schema is up to date",
            Self::Io { .. } | Self::Corrupt { .. } => "Check POMODORO_DATA_DIR permissions and contents",
            Self::Configuration(_) => "Check the store configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "request timed out after 5s");

        let err = StoreError::NotConfigured("missing url".to_string());
        assert!(err.to_string().contains("missing url"));
    }

    #[test]
    fn test_is_transient() {
        assert!(StoreError::Timeout(Duration::from_secs(5)).is_transient());
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(!StoreError::Unauthorized.is_transient());
        assert!(!StoreError::AuthFailed("bad password".into()).is_transient());
    }

    #[test]
    fn test_suggestion() {
        assert!(StoreError::NotConfigured("x".into())
            .suggestion()
            .contains("POMODORO_SUPABASE_URL"));
        assert!(StoreError::Unauthorized.suggestion().contains("login"));
    }
}
