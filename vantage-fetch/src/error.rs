//! Error types for the vantage-fetch crate.
//!
//! Every network failure names the target it was raised for, so a caller
//! holding only the error can tell which upstream misbehaved and how.

use std::fmt;

/// Stable classification of a failure, independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The exchange did not finish within the session timeout.
    Timeout,
    /// The endpoint signalled throttling or bot detection.
    RateLimited,
    /// Any other transport or status failure.
    Generic,
    /// The endpoint reported that the resource does not exist.
    NotFound,
    /// The session had already failed; no I/O was performed.
    PriorFailure,
    /// A response body could not be interpreted.
    Parse,
    /// Invalid configuration or request shape.
    Config,
    /// The execution bridge could not run the submitted unit.
    Bridge,
}

impl FailureKind {
    /// Returns the stable name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Generic => "generic",
            Self::NotFound => "not_found",
            Self::PriorFailure => "prior_failure",
            Self::Parse => "parse",
            Self::Config => "config",
            Self::Bridge => "bridge",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while fetching, retrying, or aggregating.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The exchange timed out (retryable).
    #[error("request to {target} timed out: {detail}")]
    Timeout { target: String, detail: String },

    /// The endpoint answered with a throttling status (retryable).
    #[error("rate limited by {target} (HTTP {status})")]
    RateLimited { target: String, status: u16 },

    /// Unexpected status or transport fault (retryable).
    #[error("request to {target} failed: {detail}")]
    Generic { target: String, detail: String },

    /// The endpoint answered 404 (terminal).
    #[error("{target} not found (HTTP 404)")]
    NotFound { target: String },

    /// Short-circuited because the owning session already failed.
    #[error("skipped {target}: an earlier call on this session failed")]
    PriorFailure { target: String },

    /// A response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The execution bridge rejected or lost the submitted unit.
    #[error("bridge error: {0}")]
    Bridge(String),
}

impl FetchError {
    /// Returns the stable kind of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Generic { .. } => FailureKind::Generic,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::PriorFailure { .. } => FailureKind::PriorFailure,
            Self::Parse(_) => FailureKind::Parse,
            Self::Config(_) => FailureKind::Config,
            Self::Bridge(_) => FailureKind::Bridge,
        }
    }

    /// Returns true for failures the retry policy may re-attempt.
    ///
    /// Only timeouts, rate limiting and generic network failures qualify.
    /// `NotFound` and `PriorFailure` are terminal, and nothing outside the
    /// network layer is ever retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::RateLimited { .. } | Self::Generic { .. }
        )
    }

    /// The target URL this error was raised for, if it came from the network layer.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Timeout { target, .. }
            | Self::RateLimited { target, .. }
            | Self::Generic { target, .. }
            | Self::NotFound { target }
            | Self::PriorFailure { target } => Some(target),
            Self::Parse(_) | Self::Config(_) | Self::Bridge(_) => None,
        }
    }
}

/// Convenience type alias for vantage-fetch results.
pub type Result<T> = std::result::Result<T, FetchError>;
