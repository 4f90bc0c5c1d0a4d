//! HTTP client settings and retry timing.
//!
//! Transient failures (503 responses and refused connections) are retried until
//! a wall-clock budget runs out, sleeping `unit * n²` before retry `n`.

use std::time::Duration;

/// HTTPS port of the management API.
pub const SECURE_PORT: u16 = 7718;

/// Plain HTTP port of the management API.
pub const INSECURE_PORT: u16 = 7717;

/// API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2.2";

/// Tenant used when none is configured.
pub const DEFAULT_TENANT: &str = "/root";

/// Default timeout for a single HTTP request (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// Default wall-clock budget for retrying a request (seconds)
pub const DEFAULT_RETRY_TIMEOUT: u64 = 300;

/// Default backoff unit (seconds); retry `n` sleeps `n²` units
pub const DEFAULT_BACKOFF_UNIT: u64 = 1;

// Connection pool settings

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

/// Default TCP connect timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

/// Retry policy with quadratic backoff bounded by total elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total time allowed for all attempts of one request
    pub timeout: Duration,

    /// Base delay; retry `n` sleeps `backoff_unit * n²`
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_RETRY_TIMEOUT),
            backoff_unit: Duration::from_secs(DEFAULT_BACKOFF_UNIT),
        }
    }

    /// Set the total retry budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the backoff unit.
    #[must_use]
    pub const fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Calculate the sleep before retry number `attempt` (1-based).
    ///
    /// Uses quadratic backoff: delay = backoff_unit * attempt²
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff_unit
            .saturating_mul(attempt.saturating_mul(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client configuration.
///
/// Configures the transport used by a connection: per-request timeout, retry
/// policy and connection pooling.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Retry policy
    pub retry_policy: RetryPolicy,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            retry_policy: RetryPolicy::new(),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set TCP connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}
