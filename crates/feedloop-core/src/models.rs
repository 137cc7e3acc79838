use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Static configuration for one feed endpoint.
///
/// `key` must be unique across the endpoint set (validated at build time).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Unique identifier, carried through to the shutdown result.
    pub key: String,
    /// The first URI this endpoint will fetch.
    pub start_uri: String,
    /// Fixed-rate polling period. Must be greater than zero.
    pub period: Duration,
}

impl EndpointSpec {
    pub fn new(key: impl Into<String>, start_uri: impl Into<String>, period: Duration) -> Self {
        Self {
            key: key.into(),
            start_uri: start_uri.into(),
            period,
        }
    }
}

/// Final position of one endpoint, snapshotted at shutdown.
///
/// `last_unread_uri` is the URI the endpoint would have fetched next — it has
/// not been consumed yet, which makes it the natural resume point for a
/// caller that wants to carry state into a later run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResult {
    pub key: String,
    pub first_started_uri: String,
    pub last_unread_uri: String,
}

impl PollResult {
    pub fn new(
        key: impl Into<String>,
        first_started_uri: impl Into<String>,
        last_unread_uri: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            first_started_uri: first_started_uri.into(),
            last_unread_uri: last_unread_uri.into(),
        }
    }

    /// True once at least one successful cycle has advanced the cursor.
    pub fn advanced(&self) -> bool {
        self.first_started_uri != self.last_unread_uri
    }
}

/// How the shutdown sequence terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All in-flight cycles finished within the deadline.
    Clean,
    /// The deadline elapsed and outstanding work was aborted. `terminated`
    /// reports whether every task settled within the secondary grace period.
    Forced { terminated: bool },
    /// The shutdown wait itself was cancelled externally; outstanding work
    /// was aborted immediately.
    Interrupted,
}

impl ShutdownOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, ShutdownOutcome::Clean)
    }

    /// True if the caller's cancellation signal cut the wait short.
    pub fn was_interrupted(&self) -> bool {
        matches!(self, ShutdownOutcome::Interrupted)
    }
}

/// Everything `shutdown` has to say: one result per registered endpoint, in
/// registration order, plus how termination went. Results are produced
/// unconditionally — forced or interrupted shutdown still reports every unit.
#[derive(Debug)]
pub struct ShutdownReport {
    pub outcome: ShutdownOutcome,
    pub results: Vec<PollResult>,
}

impl ShutdownReport {
    pub fn into_results(self) -> Vec<PollResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_spec_construction() {
        let spec = EndpointSpec::new("foo", "http://feeds.test/foo", Duration::from_millis(200));
        assert_eq!(spec.key, "foo");
        assert_eq!(spec.start_uri, "http://feeds.test/foo");
        assert_eq!(spec.period, Duration::from_millis(200));
    }

    #[test]
    fn test_poll_result_advanced() {
        let stalled = PollResult::new("foo", "u/foo", "u/foo");
        assert!(!stalled.advanced());

        let moved = PollResult::new("foo", "u/foo", "u/foo/3");
        assert!(moved.advanced());
    }

    #[test]
    fn test_shutdown_outcome_predicates() {
        assert!(ShutdownOutcome::Clean.is_clean());
        assert!(!ShutdownOutcome::Forced { terminated: true }.is_clean());
        assert!(ShutdownOutcome::Interrupted.was_interrupted());
        assert!(!ShutdownOutcome::Forced { terminated: false }.was_interrupted());
    }

    #[test]
    fn test_report_yields_results_in_order() {
        let report = ShutdownReport {
            outcome: ShutdownOutcome::Clean,
            results: vec![
                PollResult::new("foo", "u/foo", "u/foo/1"),
                PollResult::new("bar", "u/bar", "u/bar"),
            ],
        };
        let results = report.into_results();
        assert_eq!(results[0].key, "foo");
        assert_eq!(results[1].key, "bar");
    }

    #[test]
    fn test_endpoint_spec_serde_roundtrip() {
        let spec = EndpointSpec::new("foo", "http://feeds.test/foo", Duration::from_secs(1));
        let json = serde_json::to_string(&spec).unwrap();
        let back: EndpointSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
