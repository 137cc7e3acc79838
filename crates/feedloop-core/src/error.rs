use thiserror::Error;

/// Runtime failures surfaced by a single poll cycle.
#[derive(Error, Debug)]
pub enum PollError {
    /// HTTP request failed (non-success status, malformed URI, bad body).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    Network(String),

    /// The feed carried no new content. Expected and benign: the same URI is
    /// read again next period and the condition is never routed to the sink.
    #[error("Feed is empty, no new content")]
    EmptyFeed,

    /// The cursor advancer could not derive the next URI from the body.
    #[error("Advance error: {0}")]
    Advance(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl PollError {
    /// Returns true for the distinguished empty-feed signal.
    pub fn is_empty_feed(&self) -> bool {
        matches!(self, PollError::EmptyFeed)
    }

    /// Returns true if this error came from the transport rather than the
    /// advancer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            PollError::Http(_) | PollError::Timeout(_) | PollError::Network(_)
        )
    }
}

/// Assembly-time configuration failures. Raised by
/// [`FeedPollerBuilder::build`](crate::poller::FeedPollerBuilder::build)
/// before any unit is created; never surfaced as a runtime poll failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No endpoint found for poller")]
    NoEndpoints,

    #[error("No cursor advancer is found for poller")]
    MissingAdvancer,

    #[error("No feed fetcher is found for poller")]
    MissingFetcher,

    #[error("Duplicate endpoint key: {0}")]
    DuplicateKey(String),

    #[error("Endpoint '{0}' has a zero polling period")]
    ZeroPeriod(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_feed_is_distinguished() {
        assert!(PollError::EmptyFeed.is_empty_feed());
        assert!(!PollError::Http("404".into()).is_empty_feed());
        assert!(!PollError::Advance("no next link".into()).is_empty_feed());
    }

    #[test]
    fn test_transport_errors() {
        assert!(PollError::Http("HTTP 500".into()).is_transport());
        assert!(PollError::Timeout(30).is_transport());
        assert!(PollError::Network("connection reset".into()).is_transport());
        assert!(!PollError::EmptyFeed.is_transport());
        assert!(!PollError::Advance("bad body".into()).is_transport());
    }

    #[test]
    fn test_config_error_messages_name_the_endpoint() {
        let err = ConfigError::DuplicateKey("foo".into());
        assert!(err.to_string().contains("foo"));

        let err = ConfigError::ZeroPeriod("bar".into());
        assert!(err.to_string().contains("bar"));
    }
}
