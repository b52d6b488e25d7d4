//! # Relgraph Dispatch
//!
//! Bounded-concurrency fan-out of permission checks.
//!
//! ## Features
//!
//! - **Concurrency ceiling**: at most `max_concurrent` dispatch calls in
//!   flight, whatever the shape of the permission graph
//! - **Backpressure**: enqueue waits until the dispatch loop can accept
//!   more work
//! - **First failure wins**: one failed check cancels the shared lifetime
//!   and is the only thing `finish` reports
//! - **Deduplicated results**: resources with membership are collected into
//!   a single `OnrSet`
//!
//! See [`ParallelChecker`] for a complete example.

pub mod checker;
pub mod config;
pub mod error;
pub mod onr_set;
pub mod stats;

// Re-export commonly used types
pub use checker::{CheckQueue, ParallelChecker};
pub use config::CheckerConfig;
pub use error::{CheckError, Result};
pub use onr_set::{OnrSet, ResultCollector};
pub use stats::CheckerStats;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
