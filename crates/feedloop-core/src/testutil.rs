//! Test utilities: mock implementations of the collaborator traits.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! Mocks that record calls use `Arc<Mutex<_>>` for interior mutability, so a
//! clone kept by the test shares state with the clone given to the poller.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::PollError;
use crate::traits::{CursorAdvancer, ExceptionSink, FeedFetcher};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Fetcher with a scripted queue of responses that records every call.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element; when empty, the
    /// fetch echoes the requested URI as the body.
    responses: Arc<Mutex<Vec<Result<String, PollError>>>>,
    /// Recorded `(uri, accept)` pairs, one per fetch.
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockFetcher {
    pub fn new(body: &str) -> Self {
        Self::with_responses(vec![Ok(body.to_string())])
    }

    pub fn with_responses(responses: Vec<Result<String, PollError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for MockFetcher {
    async fn fetch(&self, uri: &str, accept: &str) -> Result<String, PollError> {
        self.calls
            .lock()
            .unwrap()
            .push((uri.to_string(), accept.to_string()));
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(uri.to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// EchoFetcher
// ---------------------------------------------------------------------------

/// Fetcher whose body is the requested URI. Pairs with [`ChainAdvancer`] to
/// walk a literal URI chain without a server.
#[derive(Debug, Clone, Copy)]
pub struct EchoFetcher;

#[async_trait]
impl FeedFetcher for EchoFetcher {
    async fn fetch(&self, uri: &str, _accept: &str) -> Result<String, PollError> {
        Ok(uri.to_string())
    }
}

// ---------------------------------------------------------------------------
// FailingFetcher
// ---------------------------------------------------------------------------

/// Fetcher that fails every call with the same HTTP error.
#[derive(Clone)]
pub struct FailingFetcher {
    message: String,
}

impl FailingFetcher {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl FeedFetcher for FailingFetcher {
    async fn fetch(&self, _uri: &str, _accept: &str) -> Result<String, PollError> {
        Err(PollError::Http(self.message.clone()))
    }
}

// ---------------------------------------------------------------------------
// PendingFetcher
// ---------------------------------------------------------------------------

/// Fetcher that never resolves. Any cycle that reaches it blocks until the
/// task is aborted; exercises the forced-shutdown path.
#[derive(Debug, Clone, Copy)]
pub struct PendingFetcher;

#[async_trait]
impl FeedFetcher for PendingFetcher {
    async fn fetch(&self, _uri: &str, _accept: &str) -> Result<String, PollError> {
        std::future::pending().await
    }
}

// ---------------------------------------------------------------------------
// ChainAdvancer
// ---------------------------------------------------------------------------

/// Advancer for bodies that are themselves URIs: `u/foo -> u/foo/1 ->
/// u/foo/2 -> …`. With a limit, reaching it turns into the empty-feed signal,
/// modelling a feed that has run out of new pages.
#[derive(Debug, Clone, Copy)]
pub struct ChainAdvancer {
    limit: Option<u64>,
}

impl ChainAdvancer {
    pub fn unbounded() -> Self {
        Self { limit: None }
    }

    pub fn with_limit(limit: u64) -> Self {
        Self { limit: Some(limit) }
    }
}

impl CursorAdvancer for ChainAdvancer {
    fn advance(&self, body: &str) -> Result<String, PollError> {
        let uri = body.trim();
        if uri.is_empty() {
            return Err(PollError::Advance("body carried no URI".to_string()));
        }
        match uri.rsplit_once('/') {
            Some((base, last)) => match last.parse::<u64>() {
                Ok(n) => {
                    if self.limit.is_some_and(|limit| n >= limit) {
                        Err(PollError::EmptyFeed)
                    } else {
                        Ok(format!("{}/{}", base, n + 1))
                    }
                }
                Err(_) => Ok(format!("{uri}/1")),
            },
            None => Ok(format!("{uri}/1")),
        }
    }
}

// ---------------------------------------------------------------------------
// EmptyFeedAdvancer
// ---------------------------------------------------------------------------

/// Advancer that always signals empty feed: the cursor freezes wherever it is.
#[derive(Debug, Clone, Copy)]
pub struct EmptyFeedAdvancer;

impl CursorAdvancer for EmptyFeedAdvancer {
    fn advance(&self, _body: &str) -> Result<String, PollError> {
        Err(PollError::EmptyFeed)
    }
}

// ---------------------------------------------------------------------------
// FailingAdvancer
// ---------------------------------------------------------------------------

/// Advancer that fails every call with a generic advance error.
#[derive(Clone)]
pub struct FailingAdvancer {
    message: String,
}

impl FailingAdvancer {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl CursorAdvancer for FailingAdvancer {
    fn advance(&self, _body: &str) -> Result<String, PollError> {
        Err(PollError::Advance(self.message.clone()))
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Sink that records every routed error's rendered message.
#[derive(Clone, Default)]
pub struct RecordingSink {
    errors: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl ExceptionSink for RecordingSink {
    fn handle(&self, error: &PollError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}
