//! Configuration for the parallel checker.

use crate::error::{CheckError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Configuration for one bounded fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckerConfig {
    /// Maximum number of dispatch calls in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Optional deadline for the whole fan-out, measured from `start`.
    ///
    /// Expiry cancels the shared lifetime and `finish` reports
    /// [`CheckError::Timeout`].
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Emit a debug event for every dispatch call.
    #[serde(default = "default_true")]
    pub log_dispatches: bool,
}

fn default_max_concurrent() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            timeout_ms: None,
            log_dispatches: true,
        }
    }
}

impl CheckerConfig {
    /// Creates a configuration with the given concurrency ceiling.
    pub fn new(max_concurrent: usize) -> Self {
        Self::default().with_max_concurrent(max_concurrent)
    }

    /// Sets the concurrency ceiling.
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Sets the overall deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Enables or disables per-dispatch debug events.
    pub fn with_dispatch_logging(mut self, enabled: bool) -> Self {
        self.log_dispatches = enabled;
        self
    }

    /// The overall deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Rejects a ceiling below one or beyond what a semaphore can count.
    pub fn validate(&self) -> Result<()> {
        let limit = Semaphore::MAX_PERMITS.min(u32::MAX as usize);
        if self.max_concurrent == 0 || self.max_concurrent > limit {
            return Err(CheckError::InvalidConcurrency(self.max_concurrent));
        }
        Ok(())
    }
}
