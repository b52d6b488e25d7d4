//! Dispatch statistics
//!
//! Counters are updated by dispatch tasks with relaxed atomics and read as a
//! point-in-time `CheckerStats` snapshot.

use relgraph_core::{DispatchCheckResponse, Membership};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Snapshot of one checker's dispatch activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckerStats {
    /// Backend calls started
    pub dispatched: u64,

    /// Calls answered with `Member`
    pub members: u64,

    /// Calls answered with `NotMember`
    pub not_members: u64,

    /// Calls that returned an error
    pub failed: u64,

    /// Highest number of backend calls observed in flight at once
    pub peak_in_flight: usize,

    /// Sum of the dispatch counts reported by the backend
    pub backend_dispatches: u64,
}

impl CheckerStats {
    /// Calls that produced an answer or an error
    pub fn completed(&self) -> u64 {
        self.members + self.not_members + self.failed
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    dispatched: AtomicU64,
    members: AtomicU64,
    not_members: AtomicU64,
    failed: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    backend_dispatches: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn dispatch_started(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let in_flight = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::Relaxed);
    }

    pub(crate) fn dispatch_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_response(&self, response: &DispatchCheckResponse) {
        match response.membership {
            Membership::Member => self.members.fetch_add(1, Ordering::Relaxed),
            Membership::NotMember => self.not_members.fetch_add(1, Ordering::Relaxed),
        };
        self.backend_dispatches.fetch_add(
            u64::from(response.metadata.dispatch_count),
            Ordering::Relaxed,
        );
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CheckerStats {
        CheckerStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            members: self.members.load(Ordering::Relaxed),
            not_members: self.not_members.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::Relaxed),
            backend_dispatches: self.backend_dispatches.load(Ordering::Relaxed),
        }
    }
}
