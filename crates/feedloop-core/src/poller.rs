use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::ConfigError;
use crate::models::{EndpointSpec, ShutdownOutcome, ShutdownReport};
use crate::traits::{CursorAdvancer, ExceptionSink, FeedFetcher, TracingExceptionSink};
use crate::unit::{PollingUnit, UnitHandle};

/// Deadline applied to the graceful phase of shutdown when none is configured.
pub const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_millis(60_000);

/// Accept type handed to the fetcher when none is configured.
pub const DEFAULT_ACCEPT_TYPE: &str = "text/plain";

/// How long forced termination is given to take effect after the graceful
/// deadline has elapsed. Shutdown proceeds either way once this expires.
const FORCED_TERMINATION_GRACE: Duration = Duration::from_secs(60);

/// Schedules every configured endpoint at its own fixed rate and coordinates
/// graceful shutdown.
///
/// Each endpoint gets one task: successive firings of the same unit are
/// serialized by its task loop, units of different endpoints run concurrently
/// on the runtime's workers, and no unit shares mutable state with another.
/// A firing that comes due while the previous cycle is still running is
/// queued and starts as soon as the cycle finishes, never concurrently with
/// it.
///
/// Calling [`start`](Self::start) more than once is a caller error and is
/// ignored with a warning. [`shutdown`](Self::shutdown) consumes the poller,
/// so it can only happen once.
pub struct FeedPoller {
    endpoints: Vec<EndpointSpec>,
    fetcher: Arc<dyn FeedFetcher>,
    advancer: Arc<dyn CursorAdvancer>,
    sink: Arc<dyn ExceptionSink>,
    initial_delay: Duration,
    shutdown_deadline: Duration,
    accept: String,
    registry: Vec<UnitHandle>,
    tasks: JoinSet<()>,
    quiesce: CancellationToken,
    started: bool,
}

impl std::fmt::Debug for FeedPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedPoller")
            .field("endpoints", &self.endpoints)
            .field("initial_delay", &self.initial_delay)
            .field("shutdown_deadline", &self.shutdown_deadline)
            .field("accept", &self.accept)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

enum Wait {
    Drained,
    DeadlineElapsed,
    Cancelled,
}

impl FeedPoller {
    pub fn builder() -> FeedPollerBuilder {
        FeedPollerBuilder::new()
    }

    /// Construct one [`PollingUnit`] per configured endpoint and submit it
    /// for fixed-rate execution: first firing after the initial delay, then
    /// every `period`, measured start-to-start.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.started {
            tracing::warn!("FeedPoller::start called more than once, ignoring");
            return;
        }
        self.started = true;

        let first_fire = Instant::now() + self.initial_delay;
        for spec in &self.endpoints {
            let unit = PollingUnit::new(
                spec.key.clone(),
                spec.start_uri.clone(),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.advancer),
                Arc::clone(&self.sink),
                self.accept.clone(),
            );
            self.registry.push(unit.handle());

            let period = spec.period;
            let quiesce = self.quiesce.clone();
            self.tasks.spawn(async move {
                let mut ticker = time::interval_at(first_fire, period);
                // Default missed-tick behavior is burst: a firing delayed by
                // a slow cycle runs as soon as the task is free. Biased so a
                // tick already due when shutdown is requested is not started.
                loop {
                    tokio::select! {
                        biased;
                        () = quiesce.cancelled() => break,
                        _ = ticker.tick() => unit.run_cycle().await,
                    }
                }
            });
        }

        tracing::info!(endpoints = self.registry.len(), "FeedPoller started");
    }

    /// Gracefully shut down all units and report their final positions.
    ///
    /// No new cycles begin once this is called. In-flight cycles get up to
    /// the configured deadline to finish, then are aborted and given a fixed
    /// secondary grace period to settle. Whichever path is taken, one
    /// [`PollResult`](crate::models::PollResult) per unit is returned, in
    /// registration order.
    pub async fn shutdown(self) -> ShutdownReport {
        self.shutdown_with_cancel(CancellationToken::new()).await
    }

    /// [`shutdown`](Self::shutdown), but the wait itself can be cancelled
    /// through `cancel`. When that happens, outstanding work is aborted
    /// immediately and the report carries [`ShutdownOutcome::Interrupted`] so
    /// the caller can tell external cancellation apart from a deadline that
    /// ran out.
    pub async fn shutdown_with_cancel(mut self, cancel: CancellationToken) -> ShutdownReport {
        tracing::info!(
            deadline_ms = self.shutdown_deadline.as_millis() as u64,
            "FeedPoller is starting to gracefully shut down all units"
        );
        self.quiesce.cancel();

        let waited = tokio::select! {
            drained = time::timeout(self.shutdown_deadline, Self::drain(&mut self.tasks)) => {
                if drained.is_ok() {
                    Wait::Drained
                } else {
                    Wait::DeadlineElapsed
                }
            }
            () = cancel.cancelled() => Wait::Cancelled,
        };

        let outcome = match waited {
            Wait::Drained => ShutdownOutcome::Clean,
            Wait::DeadlineElapsed => {
                tracing::warn!("FeedPoller is forced to shut down");
                self.tasks.abort_all();
                if time::timeout(FORCED_TERMINATION_GRACE, Self::drain(&mut self.tasks))
                    .await
                    .is_ok()
                {
                    ShutdownOutcome::Forced { terminated: true }
                } else {
                    tracing::warn!("FeedPoller is not able to terminate");
                    ShutdownOutcome::Forced { terminated: false }
                }
            }
            Wait::Cancelled => {
                tracing::error!(
                    "Shutdown wait was cancelled, all units are being stopped immediately"
                );
                self.tasks.abort_all();
                ShutdownOutcome::Interrupted
            }
        };

        let results = self.registry.iter().map(UnitHandle::snapshot).collect();
        ShutdownReport { outcome, results }
    }

    async fn drain(tasks: &mut JoinSet<()>) {
        while tasks.join_next().await.is_some() {}
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn shutdown_deadline(&self) -> Duration {
        self.shutdown_deadline
    }

    pub fn accept_type(&self) -> &str {
        &self.accept
    }
}

/// Assembles a [`FeedPoller`], applying defaults and rejecting invalid
/// configurations before any unit is created.
pub struct FeedPollerBuilder {
    endpoints: Vec<EndpointSpec>,
    fetcher: Option<Arc<dyn FeedFetcher>>,
    advancer: Option<Arc<dyn CursorAdvancer>>,
    sink: Option<Arc<dyn ExceptionSink>>,
    initial_delay: Duration,
    shutdown_deadline: Duration,
    accept: Option<String>,
}

impl FeedPollerBuilder {
    pub fn new() -> Self {
        Self {
            endpoints: Vec::new(),
            fetcher: None,
            advancer: None,
            sink: None,
            initial_delay: Duration::ZERO,
            shutdown_deadline: DEFAULT_SHUTDOWN_DEADLINE,
            accept: None,
        }
    }

    pub fn with_endpoint(mut self, spec: EndpointSpec) -> Self {
        self.endpoints.push(spec);
        self
    }

    pub fn with_endpoints(mut self, specs: impl IntoIterator<Item = EndpointSpec>) -> Self {
        self.endpoints.extend(specs);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl FeedFetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    pub fn with_advancer(mut self, advancer: impl CursorAdvancer + 'static) -> Self {
        self.advancer = Some(Arc::new(advancer));
        self
    }

    pub fn with_exception_sink(mut self, sink: impl ExceptionSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_shutdown_deadline(mut self, deadline: Duration) -> Self {
        self.shutdown_deadline = deadline;
        self
    }

    /// Opaque content-negotiation value, forwarded verbatim to the fetcher.
    pub fn with_accept_type(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn build(self) -> Result<FeedPoller, ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        let mut seen = HashSet::new();
        for spec in &self.endpoints {
            if !seen.insert(spec.key.as_str()) {
                return Err(ConfigError::DuplicateKey(spec.key.clone()));
            }
            if spec.period.is_zero() {
                return Err(ConfigError::ZeroPeriod(spec.key.clone()));
            }
        }
        let advancer = self.advancer.ok_or(ConfigError::MissingAdvancer)?;
        let fetcher = self.fetcher.ok_or(ConfigError::MissingFetcher)?;
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingExceptionSink));

        Ok(FeedPoller {
            endpoints: self.endpoints,
            fetcher,
            advancer,
            sink,
            initial_delay: self.initial_delay,
            shutdown_deadline: self.shutdown_deadline,
            accept: self.accept.unwrap_or_else(|| DEFAULT_ACCEPT_TYPE.to_string()),
            registry: Vec::new(),
            tasks: JoinSet::new(),
            quiesce: CancellationToken::new(),
            started: false,
        })
    }
}

impl Default for FeedPollerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
