use async_trait::async_trait;

use crate::error::PollError;

/// Fetches the raw body of a feed page.
///
/// The poller passes the configured accept type through untouched; what
/// counts as a failure (non-2xx, timeout, connection refused) is this
/// collaborator's policy, not the core's.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, uri: &str, accept: &str) -> Result<String, PollError>;
}

/// Decides the next URI to poll from a fetched feed body.
///
/// Returns [`PollError::EmptyFeed`] when the feed carries no new content —
/// the cursor then stays put and the same URI is read again next period,
/// without alerting. Any other error is routed to the [`ExceptionSink`].
pub trait CursorAdvancer: Send + Sync {
    fn advance(&self, body: &str) -> Result<String, PollError>;
}

/// Receives every unexpected poll failure. Side-effect only (log, metric,
/// alert); implementations must not panic. A sink never stops the poller —
/// the failing endpoint simply retries its URI next period.
pub trait ExceptionSink: Send + Sync {
    fn handle(&self, error: &PollError);
}

/// The default sink: logs through `tracing` and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExceptionSink;

impl ExceptionSink for TracingExceptionSink {
    fn handle(&self, error: &PollError) {
        tracing::error!(error = %error, "Poll failure routed to exception sink");
    }
}
