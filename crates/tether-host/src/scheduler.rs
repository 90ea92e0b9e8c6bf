//! Cross-thread handoff onto the host's execution thread.
//!
//! Connection threads cannot touch host state directly; they submit jobs
//! through a [`JobSubmitter`] and block on the job's completion slot. The
//! host application drains the paired [`TickQueue`] from its own per-tick
//! mechanism, which is where the dispatcher actually runs.
//!
//! The submitting side waits on a condition variable with a bounded
//! timeout. A caller whose wait expires receives a synthetic timeout
//! envelope; the job still runs on a later tick and its result is
//! discarded along with the slot. There is no cancellation.

use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use tether_protocol::{Params, ResponseEnvelope};

use crate::dispatch::CommandDispatcher;

const SCHEDULER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::scheduler");

/// Message returned when the host thread does not finish in time.
pub const TIMEOUT_MESSAGE: &str = "Command execution timed out";

/// One command awaiting execution on the host thread.
struct Job {
    name: String,
    params: Params,
    slot: Arc<JobSlot>,
    submitted_at: Instant,
}

/// Completion slot shared between the submitting and host threads.
///
/// The result transitions `None` to `Some` exactly once; a second
/// completion attempt is ignored.
#[derive(Debug)]
struct JobSlot {
    result: Mutex<Option<ResponseEnvelope>>,
    done: Condvar,
}

impl JobSlot {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn complete(&self, response: ResponseEnvelope) {
        let mut guard = lock_slot(&self.result);
        if guard.is_none() {
            *guard = Some(response);
            self.done.notify_all();
        }
    }
}

/// Recovers the guard from a poisoned slot lock. Handler panics are
/// caught at the dispatch boundary, so poisoning here means a bug in the
/// scheduler itself; the stored state is still a plain `Option` and safe
/// to read.
fn lock_slot(
    result: &Mutex<Option<ResponseEnvelope>>,
) -> MutexGuard<'_, Option<ResponseEnvelope>> {
    result.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Creates a connected submitter/queue pair around a dispatcher.
pub fn scheduler(dispatcher: CommandDispatcher) -> (JobSubmitter, TickQueue) {
    let (sender, receiver) = channel();
    (
        JobSubmitter { sender },
        TickQueue {
            receiver,
            dispatcher,
        },
    )
}

/// Cloneable handle used by connection threads to submit jobs.
#[derive(Clone)]
pub struct JobSubmitter {
    sender: Sender<Job>,
}

impl JobSubmitter {
    /// Queues a command for execution on the host thread.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::HostGone`] when the paired [`TickQueue`]
    /// has been dropped.
    pub fn submit(
        &self,
        name: impl Into<String>,
        params: Params,
    ) -> Result<PendingJob, SubmitError> {
        let slot = Arc::new(JobSlot::new());
        let job = Job {
            name: name.into(),
            params,
            slot: Arc::clone(&slot),
            submitted_at: Instant::now(),
        };
        self.sender.send(job).map_err(|_| SubmitError::HostGone)?;
        Ok(PendingJob { slot })
    }
}

/// A submitted job whose result has not yet been claimed.
#[derive(Debug)]
pub struct PendingJob {
    slot: Arc<JobSlot>,
}

impl PendingJob {
    /// Blocks until the host thread completes the job or `timeout`
    /// elapses.
    ///
    /// On timeout a synthetic error envelope is returned and the job is
    /// abandoned; it may still run later but its result is discarded.
    pub fn wait(self, timeout: Duration) -> ResponseEnvelope {
        let deadline = Instant::now() + timeout;
        let mut guard = lock_slot(&self.slot.result);
        loop {
            if let Some(response) = guard.take() {
                return response;
            }
            let now = Instant::now();
            if now >= deadline {
                return ResponseEnvelope::error(TIMEOUT_MESSAGE);
            }
            let (next_guard, _timed_out) = self
                .slot
                .done
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next_guard;
        }
    }
}

/// Errors surfaced when submitting a job.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The host-side queue has been dropped; the bridge is shutting down.
    #[error("host executor is no longer running")]
    HostGone,
}

/// Host-thread side of the scheduler.
///
/// Owned by the embedding application and drained from its per-tick
/// execution mechanism. Jobs run in submission order; no ordering is
/// guaranteed across different submitters beyond queue arrival.
#[derive(Debug)]
pub struct TickQueue {
    receiver: Receiver<Job>,
    dispatcher: CommandDispatcher,
}

impl TickQueue {
    /// Executes every job queued at the time of the call.
    ///
    /// Returns the number of jobs executed. Call this once per host
    /// tick; it never blocks.
    pub fn run_pending(&self) -> usize {
        let mut executed = 0;
        while let Ok(job) = self.receiver.try_recv() {
            let response = self.dispatcher.dispatch(&job.name, &job.params);
            debug!(
                target: SCHEDULER_TARGET,
                command = %job.name,
                queued_ms = job.submitted_at.elapsed().as_millis() as u64,
                "executed job"
            );
            job.slot.complete(response);
            executed += 1;
        }
        executed
    }
}
