//! Shared test fixtures: a scriptable dispatch backend

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use relgraph_core::{
    CoreError, DispatchCheck, DispatchCheckRequest, DispatchCheckResponse, ObjectAndRelation,
    ResponseMeta, Result,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scripted answer for one resource
#[derive(Debug, Clone)]
pub enum Outcome {
    Member,
    NotMember,
    Fail(String),
    /// Never answers; returns only once the lifetime is cancelled
    Hang,
    Panic,
}

/// Route checker logs to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fail(msg: &str) -> Outcome {
    Outcome::Fail(msg.to_string())
}

pub fn doc(id: &str) -> ObjectAndRelation {
    ObjectAndRelation::new("document", id, "viewer")
}

pub fn alice() -> ObjectAndRelation {
    ObjectAndRelation::object("user", "alice")
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Dispatch backend answering from a per-object-id script
pub struct MockDispatcher {
    outcomes: HashMap<String, Outcome>,
    default: Outcome,
    delay: Duration,
    dispatch_count: u32,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<DispatchCheckRequest>>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            default: Outcome::NotMember,
            delay: Duration::ZERO,
            dispatch_count: 1,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outcome(mut self, object_id: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(object_id.to_string(), outcome);
        self
    }

    pub fn with_default(mut self, outcome: Outcome) -> Self {
        self.default = outcome;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Dispatch count reported in every response
    pub fn with_dispatch_count(mut self, dispatch_count: u32) -> Self {
        self.dispatch_count = dispatch_count;
        self
    }

    /// Highest number of calls observed running at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<DispatchCheckRequest> {
        self.calls.lock().clone()
    }

    /// Object ids of every call received, in arrival order
    pub fn dispatched_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|request| request.resource.object_id.clone())
            .collect()
    }

    fn response(&self, outcome: &Outcome) -> Result<DispatchCheckResponse> {
        let membership = match outcome {
            Outcome::Member => true,
            Outcome::NotMember => false,
            Outcome::Fail(msg) => return Err(CoreError::dispatch(msg.clone())),
            Outcome::Hang => return Err(CoreError::Cancelled),
            Outcome::Panic => panic!("backend panicked"),
        };

        Ok(DispatchCheckResponse {
            membership: membership.into(),
            metadata: ResponseMeta {
                dispatch_count: self.dispatch_count,
                depth_required: 1,
            },
        })
    }
}

#[async_trait]
impl DispatchCheck for MockDispatcher {
    async fn dispatch_check(
        &self,
        lifetime: CancellationToken,
        request: DispatchCheckRequest,
    ) -> Result<DispatchCheckResponse> {
        if lifetime.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let outcome = self
            .outcomes
            .get(&request.resource.object_id)
            .unwrap_or(&self.default)
            .clone();
        self.calls.lock().push(request);

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::select! {
                _ = lifetime.cancelled() => return Err(CoreError::Cancelled),
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        if matches!(outcome, Outcome::Hang) {
            lifetime.cancelled().await;
        }

        self.response(&outcome)
    }
}
