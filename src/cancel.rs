//! Cooperative cancellation for running jobs.
//!
//! A [`CancellationToken`] is the only channel between whoever wants a job
//! stopped and the operation doing the work. Operations poll it once per
//! unit of work (a page, a file) and bail out when it trips; nothing is
//! interrupted preemptively.
//!
//! [`LiveJobs`] is the engine's table of in-flight tokens, keyed by job id.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use crate::job::{JobId, JobState};

/// Shared one-way flag: active until `cancel()` is called, cancelled forever after.
///
/// Clones share the same state, so the engine can keep one handle for
/// signalling while the operation polls another.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the active state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    ///
    /// Idempotent and safe from any thread, including after the job has
    /// already finished (in which case nobody observes it).
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct LiveJob {
    token: CancellationToken,
    state: JobState,
}

/// Table of jobs that have been submitted and have not yet delivered a result.
///
/// Every access goes through one mutex: insert on submit, lookup on cancel,
/// remove on completion.
#[derive(Clone, Default)]
pub struct LiveJobs {
    jobs: Arc<Mutex<HashMap<JobId, LiveJob>>>,
}

impl LiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking operation never holds this lock, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, LiveJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new job in the `Queued` state and return the token handed to its worker.
    pub fn register(&self, job_id: JobId) -> CancellationToken {
        let token = CancellationToken::new();
        self.lock().insert(
            job_id,
            LiveJob {
                token: token.clone(),
                state: JobState::Queued,
            },
        );
        token
    }

    /// Record that the worker has started running the operation.
    pub fn mark_running(&self, job_id: JobId) {
        if let Some(job) = self.lock().get_mut(&job_id) {
            debug_assert!(job.state.can_transition_to(JobState::Running));
            job.state = JobState::Running;
        }
    }

    /// Cancel a live job. Returns `false` if the id is unknown or already finished.
    pub fn cancel(&self, job_id: JobId) -> bool {
        match self.lock().get(&job_id) {
            Some(job) => {
                job.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every live job, returning how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let jobs = self.lock();
        for job in jobs.values() {
            job.token.cancel();
        }
        jobs.len()
    }

    /// Drop the job's entry once its terminal result is about to be published.
    pub fn unregister(&self, job_id: JobId) -> bool {
        self.lock().remove(&job_id).is_some()
    }

    /// Current lifecycle state of a live job.
    pub fn state(&self, job_id: JobId) -> Option<JobState> {
        self.lock().get(&job_id).map(|job| job.state)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
