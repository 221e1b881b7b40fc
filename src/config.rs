//! Application-level constants and injected backend configuration.

use std::time::Duration;

pub const APP_NAME: &str = "Cliniq";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed cadence shared by both messaging tickers (active conversation
/// history and contact roster).
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Ceiling for the stretch applied to a ticker after repeated failures.
pub const POLL_BACKOFF_CEILING: Duration = Duration::from_secs(60);

/// Per-request timeout for REST calls.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME"))
}

/// Connection settings for the clinic REST backend.
///
/// Injected at construction; components never read ambient environment
/// state. Clone freely, it is a handful of scalars.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend, with or without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Cadence of both messaging tickers while healthy.
    pub poll_interval: Duration,
    /// Ceiling for the failure backoff between ticks.
    pub backoff_ceiling: Duration,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            poll_interval: POLL_INTERVAL,
            backoff_ceiling: POLL_BACKOFF_CEILING,
        }
    }
}
