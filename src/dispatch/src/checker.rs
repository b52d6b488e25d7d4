//! Bounded fan-out of membership checks
//!
//! A `ParallelChecker` is bound to one subject. Callers enqueue candidate
//! resources while a background dispatch loop hands each one to the
//! dispatch backend, keeping at most `max_concurrent` backend calls in
//! flight. Resources answered with `Member` are collected into a single
//! [`OnrSet`].
//!
//! The loop and every dispatch task share one cancellable lifetime. The
//! first failure (backend error, caller cancellation, deadline) cancels it,
//! no further backend call starts, and `finish` reports that failure
//! instead of a partial result.
//!
//! # Lifecycle
//!
//! ```text
//! new ──> start ──> enqueue* ──> finish ──> Ok(OnrSet) | Err(CheckError)
//! ```
//!
//! `finish` consumes the checker. Cloned [`CheckQueue`] handles that outlive
//! it fail with [`CheckError::QueueClosed`].

use crate::config::CheckerConfig;
use crate::error::{CheckError, Result};
use crate::onr_set::{OnrSet, ResultCollector};
use crate::stats::{CheckerStats, StatsRecorder};
use parking_lot::Mutex;
use relgraph_core::{DispatchCheck, DispatchCheckRequest, ObjectAndRelation, ResolverMeta};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Single-assignment slot for the first failure observed by any task
#[derive(Debug, Default)]
struct FirstFailure {
    slot: Mutex<Option<CheckError>>,
}

impl FirstFailure {
    /// Store `err` unless a failure is already recorded
    fn record(&self, err: CheckError) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(err);
        true
    }

    fn take(&self) -> Option<CheckError> {
        self.slot.lock().take()
    }
}

/// State shared by the checker, its queue handles, the dispatch loop and
/// every dispatch task
struct Shared {
    subject: ObjectAndRelation,
    dispatcher: Arc<dyn DispatchCheck>,
    lifetime: CancellationToken,
    results: ResultCollector,
    failure: FirstFailure,
    stats: StatsRecorder,
    log_dispatches: bool,
}

impl Shared {
    /// Record `err` as the outcome (if nothing was recorded yet) and cancel
    /// the shared lifetime
    fn abort(&self, err: CheckError) {
        let message = err.to_string();
        if self.failure.record(err) {
            warn!("Aborting parallel check for {}: {}", self.subject, message);
        }
        self.lifetime.cancel();
    }

    /// Resolves once the lifetime is cancelled or the deadline passes
    async fn interrupted(&self, deadline: Option<(Instant, Duration)>) -> CheckError {
        match deadline {
            Some((at, timeout)) => tokio::select! {
                _ = self.lifetime.cancelled() => CheckError::Cancelled,
                _ = tokio::time::sleep_until(at) => CheckError::Timeout(timeout),
            },
            None => {
                self.lifetime.cancelled().await;
                CheckError::Cancelled
            }
        }
    }

    fn reap(&self, joined: std::result::Result<(), JoinError>) {
        if let Err(err) = joined {
            self.abort(CheckError::TaskFailed(err.to_string()));
        }
    }

    /// Pull requests off the queue and dispatch them, one token per task
    async fn dispatch_loop(
        self: Arc<Self>,
        mut requests: mpsc::Receiver<DispatchCheckRequest>,
        max_concurrent: usize,
        timeout: Option<Duration>,
    ) {
        let tokens = Arc::new(Semaphore::new(max_concurrent));
        let deadline = timeout.map(|timeout| (Instant::now() + timeout, timeout));
        let mut tasks = JoinSet::new();
        let mut aborted = false;

        debug!(
            "Dispatch loop for {} started (max_concurrent: {})",
            self.subject, max_concurrent
        );

        loop {
            let token = tokio::select! {
                biased;
                err = self.interrupted(deadline) => {
                    self.abort(err);
                    aborted = true;
                    break;
                }
                token = Arc::clone(&tokens).acquire_owned() => match token {
                    Ok(token) => token,
                    Err(_) => break,
                },
            };

            let request = tokio::select! {
                biased;
                err = self.interrupted(deadline) => {
                    self.abort(err);
                    aborted = true;
                    break;
                }
                request = requests.recv() => request,
            };

            // Queue closed and empty; the token is released on the way out
            let Some(request) = request else {
                break;
            };

            tasks.spawn(Arc::clone(&self).check(request, token));

            while let Some(joined) = tasks.try_join_next() {
                self.reap(joined);
            }
        }

        // Pending and future enqueues now fail fast
        requests.close();
        drop(requests);

        loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    Some(joined) => self.reap(joined),
                    None => break,
                },
                err = self.interrupted(deadline), if !aborted => {
                    self.abort(err);
                    aborted = true;
                }
            }
        }

        // A task that saw the cancellation skipped its insertion
        if self.lifetime.is_cancelled() {
            self.failure.record(CheckError::Cancelled);
        }

        // Every task has returned its token, so the full ceiling is free
        let ceiling = u32::try_from(max_concurrent).unwrap_or(u32::MAX);
        if tokens.try_acquire_many(ceiling).is_err() {
            self.abort(CheckError::TaskFailed(
                "dispatch tokens still held after drain".to_string(),
            ));
        }

        debug!(
            "Dispatch loop for {} drained ({} members so far)",
            self.subject,
            self.results.len()
        );
    }

    /// Run one backend call while holding a concurrency token
    async fn check(self: Arc<Self>, request: DispatchCheckRequest, _token: OwnedSemaphorePermit) {
        if self.lifetime.is_cancelled() {
            self.failure.record(CheckError::Cancelled);
            return;
        }

        let resource = request.resource.clone();
        if self.log_dispatches {
            debug!("Dispatching check of {} for {}", resource, request.subject);
        }

        self.stats.dispatch_started();
        let outcome = tokio::select! {
            biased;
            _ = self.lifetime.cancelled() => None,
            outcome = self.dispatcher.dispatch_check(self.lifetime.clone(), request) => Some(outcome),
        };
        self.stats.dispatch_finished();

        match outcome {
            None => {
                self.failure.record(CheckError::Cancelled);
            }
            Some(Ok(response)) => {
                self.stats.record_response(&response);
                if response.membership.is_member() {
                    self.results.add(resource);
                }
            }
            Some(Err(err)) => {
                self.stats.record_failure();
                debug!("Check of {} failed: {}", resource, err);
                self.abort(err.into());
            }
        }
    }
}

#[derive(Debug)]
enum QueueState {
    Idle(mpsc::Sender<DispatchCheckRequest>),
    Running(mpsc::Sender<DispatchCheckRequest>),
    Closed,
}

/// Cloneable handle for enqueueing checks into a running `ParallelChecker`
///
/// Handles can be moved into other tasks, e.g. a graph walker that
/// discovers new candidates as earlier answers arrive.
#[derive(Clone)]
pub struct CheckQueue {
    shared: Arc<Shared>,
    state: Arc<Mutex<QueueState>>,
}

impl CheckQueue {
    /// Queue a check of `resource` for the checker's subject
    ///
    /// Waits until the dispatch loop can accept the request, so a producer
    /// cannot run ahead of the available concurrency.
    ///
    /// # Errors
    ///
    /// - [`CheckError::NotStarted`] before `start`
    /// - [`CheckError::QueueClosed`] after `finish`
    /// - [`CheckError::Aborted`] once the fan-out has stopped; `finish`
    ///   reports the cause
    pub async fn enqueue(&self, resource: ObjectAndRelation, metadata: ResolverMeta) -> Result<()> {
        let sender = match &*self.state.lock() {
            QueueState::Idle(_) => return Err(CheckError::NotStarted),
            QueueState::Running(sender) => sender.clone(),
            QueueState::Closed => return Err(CheckError::QueueClosed),
        };

        let request = DispatchCheckRequest {
            metadata,
            resource,
            subject: self.shared.subject.clone(),
        };

        tokio::select! {
            biased;
            _ = self.shared.lifetime.cancelled() => Err(CheckError::Aborted),
            sent = sender.send(request) => sent.map_err(|_| CheckError::Aborted),
        }
    }

    /// Subject every queued check is evaluated for
    pub fn subject(&self) -> &ObjectAndRelation {
        &self.shared.subject
    }

    /// Whether `finish` has closed the queue
    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), QueueState::Closed)
    }

    fn open(&self) -> Result<()> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, QueueState::Closed) {
            QueueState::Idle(sender) => {
                *state = QueueState::Running(sender);
                Ok(())
            }
            QueueState::Running(sender) => {
                *state = QueueState::Running(sender);
                Err(CheckError::AlreadyStarted)
            }
            QueueState::Closed => Err(CheckError::QueueClosed),
        }
    }

    fn close(&self) {
        *self.state.lock() = QueueState::Closed;
    }
}

impl std::fmt::Debug for CheckQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckQueue")
            .field("subject", &self.shared.subject)
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Dispatches membership checks for one subject with bounded concurrency
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use relgraph_core::{
///     DispatchCheck, DispatchCheckRequest, DispatchCheckResponse, ObjectAndRelation,
///     ResolverMeta,
/// };
/// use relgraph_dispatch::ParallelChecker;
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
///
/// struct OwnersOnly;
///
/// #[async_trait]
/// impl DispatchCheck for OwnersOnly {
///     async fn dispatch_check(
///         &self,
///         _lifetime: CancellationToken,
///         request: DispatchCheckRequest,
///     ) -> relgraph_core::Result<DispatchCheckResponse> {
///         Ok(DispatchCheckResponse::new((request.resource.relation == "owner").into()))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let lifetime = CancellationToken::new();
/// let mut checker = ParallelChecker::new(
///     &lifetime,
///     Arc::new(OwnersOnly),
///     ObjectAndRelation::object("user", "alice"),
///     2,
/// )?;
///
/// checker.start()?;
/// let meta = ResolverMeta::new("rev-1");
/// checker.enqueue(ObjectAndRelation::new("document", "a", "owner"), meta.clone()).await?;
/// checker.enqueue(ObjectAndRelation::new("document", "b", "viewer"), meta).await?;
///
/// let members = checker.finish().await?;
/// assert_eq!(members.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct ParallelChecker {
    shared: Arc<Shared>,
    config: CheckerConfig,
    queue: CheckQueue,
    requests: Option<mpsc::Receiver<DispatchCheckRequest>>,
    dispatch_loop: Option<JoinHandle<()>>,
}

impl ParallelChecker {
    /// Create a checker for `subject` allowing `max_concurrent` backend
    /// calls at once
    ///
    /// The checker's lifetime is a child of `lifetime`: cancelling the
    /// caller's token aborts the fan-out, while an internal abort leaves the
    /// caller's token untouched.
    pub fn new(
        lifetime: &CancellationToken,
        dispatcher: Arc<dyn DispatchCheck>,
        subject: ObjectAndRelation,
        max_concurrent: usize,
    ) -> Result<Self> {
        Self::with_config(lifetime, dispatcher, subject, CheckerConfig::new(max_concurrent))
    }

    /// Create a checker from a full configuration
    pub fn with_config(
        lifetime: &CancellationToken,
        dispatcher: Arc<dyn DispatchCheck>,
        subject: ObjectAndRelation,
        config: CheckerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            subject,
            dispatcher,
            lifetime: lifetime.child_token(),
            results: ResultCollector::new(),
            failure: FirstFailure::default(),
            stats: StatsRecorder::default(),
            log_dispatches: config.log_dispatches,
        });

        // One slot: an enqueue returns once the loop has room for it
        let (sender, requests) = mpsc::channel(1);
        let queue = CheckQueue {
            shared: Arc::clone(&shared),
            state: Arc::new(Mutex::new(QueueState::Idle(sender))),
        };

        Ok(Self {
            shared,
            config,
            queue,
            requests: Some(requests),
            dispatch_loop: None,
        })
    }

    pub fn subject(&self) -> &ObjectAndRelation {
        &self.shared.subject
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Handle for enqueueing from other tasks
    pub fn queue(&self) -> CheckQueue {
        self.queue.clone()
    }

    /// Start the dispatch loop
    ///
    /// Must be called from within a Tokio runtime, exactly once, before any
    /// enqueue.
    pub fn start(&mut self) -> Result<()> {
        let requests = self.requests.take().ok_or(CheckError::AlreadyStarted)?;
        self.queue.open()?;

        let dispatch_loop = Arc::clone(&self.shared).dispatch_loop(
            requests,
            self.config.max_concurrent,
            self.config.timeout(),
        );
        self.dispatch_loop = Some(tokio::spawn(dispatch_loop));

        Ok(())
    }

    /// Queue a check of `resource`; see [`CheckQueue::enqueue`]
    pub async fn enqueue(&self, resource: ObjectAndRelation, metadata: ResolverMeta) -> Result<()> {
        self.queue.enqueue(resource, metadata).await
    }

    /// Current dispatch statistics
    pub fn stats(&self) -> CheckerStats {
        self.shared.stats.snapshot()
    }

    /// Close the queue, wait for every dispatch to finish and return the
    /// resources found to have membership
    ///
    /// On failure no partial set is returned: membership is unknown for
    /// every queued resource.
    pub async fn finish(self) -> Result<OnrSet> {
        self.finish_with_stats().await.map(|(members, _)| members)
    }

    /// Like [`finish`](Self::finish), also returning final statistics
    pub async fn finish_with_stats(mut self) -> Result<(OnrSet, CheckerStats)> {
        self.queue.close();
        let dispatch_loop = self.dispatch_loop.take().ok_or(CheckError::NotStarted)?;

        if let Err(err) = dispatch_loop.await {
            self.shared.abort(CheckError::TaskFailed(err.to_string()));
        }

        let stats = self.shared.stats.snapshot();
        if let Some(err) = self.shared.failure.take() {
            return Err(err);
        }

        let members = self.shared.results.take();
        info!(
            "Parallel check for {} finished: {} members from {} dispatches",
            self.shared.subject,
            members.len(),
            stats.dispatched
        );

        Ok((members, stats))
    }
}

impl Drop for ParallelChecker {
    fn drop(&mut self) {
        self.queue.close();
        self.shared.lifetime.cancel();
    }
}

impl std::fmt::Debug for ParallelChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelChecker")
            .field("subject", &self.shared.subject)
            .field("config", &self.config)
            .field("started", &self.dispatch_loop.is_some())
            .finish()
    }
}
