//! Prometheus counters and structured logging for wallet-desk.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Process-wide counters for updates, commands, callbacks and failures
//! - Periodic statistics summary written to the log

pub mod error;
pub mod logging;
pub mod metrics;
pub mod stats;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use stats::{StatsReporter, StatsSnapshot};
