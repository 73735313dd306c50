//! The HTTP capability injected into the fetch orchestrator.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// How a single feed request failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("missing or malformed field: {0}")]
    Schema(String),
}

/// Abstract GET-a-JSON-document capability. Production uses
/// [`HttpTransport`]; tests substitute an in-memory mock.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, FeedError>;
}

/// reqwest-backed transport sharing one connection pool across all feeds.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(300))
            .pool_max_idle_per_host(1)
            .timeout(request_timeout)
            .build()
            .map_err(|e| FeedError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FeedError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UpstreamStatus(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FeedError::Schema(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transport_error_on_unreachable_host() {
        let transport = HttpTransport::new(Duration::from_secs(1)).unwrap();
        let result = transport.get_json("http://127.0.0.1:1/api/mempool").await;
        assert!(matches!(result, Err(FeedError::Transport(_))));
    }
}
