//! Unified error types for permission dispatch
//!
//! Backends report failures through `CoreError`; the dispatch engine treats
//! every variant the same way and aborts the whole fan-out.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for dispatch backends and identity parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An object-and-relation string could not be parsed
    #[error("Invalid object and relation `{input}`: {reason}")]
    InvalidOnr { input: String, reason: String },

    /// A dispatch call failed
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// The recursion budget carried in resolver metadata ran out
    #[error("Max depth exceeded")]
    DepthExceeded,

    /// The dispatch call observed its lifetime being cancelled
    #[error("Dispatch cancelled")]
    Cancelled,

    /// Operation timeout
    #[error("Timeout")]
    Timeout,

    /// Generic error for uncategorized cases
    #[error("Error: {0}")]
    Generic(String),
}

impl CoreError {
    /// Create an object-and-relation parse error
    pub fn invalid_onr<I: Into<String>, R: Into<String>>(input: I, reason: R) -> Self {
        CoreError::InvalidOnr {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a dispatch error
    pub fn dispatch<S: Into<String>>(msg: S) -> Self {
        CoreError::Dispatch(msg.into())
    }

    /// Create a generic error
    pub fn generic<S: Into<String>>(msg: S) -> Self {
        CoreError::Generic(msg.into())
    }
}
