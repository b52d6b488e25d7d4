//! Error types for the parallel checker

use relgraph_core::CoreError;
use std::time::Duration;
use thiserror::Error;

/// Parallel checker errors
#[derive(Debug, Error)]
pub enum CheckError {
    /// The concurrency ceiling is zero or too large for the token pool
    #[error("Invalid concurrency limit: {0}")]
    InvalidConcurrency(usize),

    /// Enqueue or finish was called before start
    #[error("Parallel checker has not been started")]
    NotStarted,

    /// Start was called more than once
    #[error("Parallel checker has already been started")]
    AlreadyStarted,

    /// Enqueue was called after finish closed the queue
    #[error("Check queue is closed")]
    QueueClosed,

    /// The fan-out stopped before this check could be queued; `finish`
    /// reports the cause
    #[error("Dispatch aborted")]
    Aborted,

    /// A dispatch backend call failed
    #[error(transparent)]
    Dispatch(#[from] CoreError),

    /// The shared lifetime was cancelled by the caller
    #[error("Parallel check cancelled")]
    Cancelled,

    /// The configured deadline passed before every check completed
    #[error("Parallel check timed out after {0:?}")]
    Timeout(Duration),

    /// A dispatch task panicked or was aborted by the runtime
    #[error("Dispatch task failed: {0}")]
    TaskFailed(String),
}

impl CheckError {
    /// Whether the error reports misuse of the checker rather than a
    /// failed or interrupted check
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CheckError::InvalidConcurrency(_)
                | CheckError::NotStarted
                | CheckError::AlreadyStarted
                | CheckError::QueueClosed
        )
    }
}

/// Result type for parallel checker operations
pub type Result<T> = std::result::Result<T, CheckError>;
