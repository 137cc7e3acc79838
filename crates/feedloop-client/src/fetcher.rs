use std::time::Duration;

use async_trait::async_trait;
use feedloop_core::error::PollError;
use feedloop_core::traits::FeedFetcher;
use reqwest::Client;
use reqwest::header::ACCEPT;
use url::Url;

/// HTTP feed fetcher using reqwest.
///
/// Downloads feed pages with a configurable timeout, forwarding the poller's
/// accept type as the `Accept` header. What counts as a failure here — bad
/// URI, connect error, timeout, non-2xx status — surfaces as a [`PollError`]
/// and leaves the poller's cursor untouched for the next period.
#[derive(Clone)]
pub struct ReqwestFeedFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFeedFetcher {
    pub fn new() -> Result<Self, PollError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, PollError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent("feedloop/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| PollError::Http(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl FeedFetcher for ReqwestFeedFetcher {
    async fn fetch(&self, uri: &str, accept: &str) -> Result<String, PollError> {
        let url = Url::parse(uri).map_err(|e| PollError::Http(format!("Invalid URI: {e}")))?;

        tracing::debug!(uri = %url, accept = %accept, "Fetching feed page");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PollError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    PollError::Network(format!("Connection failed: {e}"))
                } else {
                    PollError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Http(format!(
                "HTTP {} for {}",
                status.as_u16(),
                uri
            )));
        }

        response
            .text()
            .await
            .map_err(|e| PollError::Http(format!("Failed to read response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unparseable_uri() {
        let fetcher = ReqwestFeedFetcher::new().unwrap();
        let err = fetcher.fetch("not a uri", "text/plain").await.unwrap_err();
        assert!(err.to_string().contains("Invalid URI"));
    }

    #[tokio::test]
    async fn connection_failure_maps_to_transport_error() {
        // discard port, nothing listening
        let fetcher = ReqwestFeedFetcher::with_timeout(Duration::from_secs(2)).unwrap();
        let err = fetcher
            .fetch("http://127.0.0.1:9/feed", "text/plain")
            .await
            .unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err}");
    }
}
