//! Error types for the vantage host.

use vantage_fetch::FetchError;

/// Top-level error type for the host application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be read, parsed or validated.
    #[error("config error: {0}")]
    Config(String),

    /// Request orchestration error.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Invalid command-line usage.
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
