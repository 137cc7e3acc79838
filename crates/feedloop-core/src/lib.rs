pub mod error;
pub mod models;
pub mod poller;
pub mod testutil;
pub mod traits;
pub mod unit;

pub use error::{ConfigError, PollError};
pub use models::{EndpointSpec, PollResult, ShutdownOutcome, ShutdownReport};
pub use poller::{DEFAULT_ACCEPT_TYPE, DEFAULT_SHUTDOWN_DEADLINE, FeedPoller, FeedPollerBuilder};
pub use traits::{CursorAdvancer, ExceptionSink, FeedFetcher, TracingExceptionSink};
