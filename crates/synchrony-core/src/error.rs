//! Error types for the synchrony clock

use thiserror::Error;

/// Synchrony errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynchronyError {
    #[error("Invalid synchrony bound: {0}")]
    InvalidSynchronyBound(String),

    #[error("Protocol clock already started")]
    AlreadyStarted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Logging initialisation failed: {0}")]
    Logging(String),

    #[error("No async runtime available: {0}")]
    NoRuntime(String),
}

/// Result type for synchrony operations
pub type SynchronyResult<T> = Result<T, SynchronyError>;
