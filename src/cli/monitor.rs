//! System metrics polling for the `monitor` command.
//!
//! Fetches `GET /api/system/info` from the daemon's HTTP API on a fixed
//! interval. A failed poll is shown as "unavailable" and retried on the next
//! tick; it never ends the loop.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::cli::commands::MonitorArgs;
use crate::cli::display::Display;
use crate::metrics::SystemInfo;

/// Time between two polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while polling the metrics endpoint.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("request timed out")]
    Timeout,

    #[error("daemon unreachable: {0}")]
    Unavailable(String),

    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

/// Client for the metrics endpoint.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    client: Client,
    url: String,
}

impl MetricsClient {
    /// Creates a client for the API at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MonitorError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/api/system/info", base_url.trim_end_matches('/')),
        })
    }

    /// Fetches one sample.
    pub async fn fetch(&self) -> Result<SystemInfo, MonitorError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                MonitorError::Timeout
            } else {
                MonitorError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::InvalidResponse(format!("HTTP {}", status)));
        }

        response
            .json::<SystemInfo>()
            .await
            .map_err(|e| MonitorError::InvalidResponse(e.to_string()))
    }
}

/// Polls until `count` samples were shown, or forever without a count.
pub async fn run(args: &MonitorArgs) -> anyhow::Result<()> {
    run_with_interval(args, POLL_INTERVAL).await
}

async fn run_with_interval(args: &MonitorArgs, interval: Duration) -> anyhow::Result<()> {
    let client = MetricsClient::new(&args.url)?;
    let mut ticker = tokio::time::interval(interval);
    let mut shown = 0u32;

    loop {
        ticker.tick().await;

        match client.fetch().await {
            Ok(info) => Display::show_system_info(Some(&info)),
            Err(e) => {
                tracing::debug!(error = %e, "Metrics poll failed");
                Display::show_system_info(None);
            }
        }

        shown += 1;
        if args.count.is_some_and(|count| shown >= count) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_body() -> serde_json::Value {
        serde_json::json!({
            "cpu": { "usage": 12.5 },
            "memory": { "used": 1024, "total": 4096, "percentage": 25.0 },
            "timestamp": 1_700_000_000_000_i64
        })
    }

    #[tokio::test]
    async fn test_fetch_parses_sample() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_body()))
            .mount(&server)
            .await;

        let client = MetricsClient::new(&format!("{}/", server.uri())).unwrap();
        let info = client.fetch().await.unwrap();

        assert_eq!(info.cpu.usage, 12.5);
        assert_eq!(info.cpu.temperature, None);
        assert_eq!(info.memory.total, 4096);
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/info"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": "Failed to get system information"
            })))
            .mount(&server)
            .await;

        let client = MetricsClient::new(&server.uri()).unwrap();
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, MonitorError::InvalidResponse(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // Nothing listens on port 9 of localhost
        let client = MetricsClient::new("http://127.0.0.1:9").unwrap();
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, MonitorError::Unavailable(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_run_stops_after_count_despite_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/system/info"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let args = MonitorArgs {
            url: server.uri(),
            count: Some(3),
        };
        run_with_interval(&args, Duration::from_millis(10))
            .await
            .unwrap();
    }
}
