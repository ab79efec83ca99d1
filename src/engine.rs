//! Job execution engine.
//!
//! [`JobQueue::submit`] resolves the operation, registers a cancellation
//! token and returns immediately; the job then waits for a worker permit and
//! runs on tokio's blocking pool. Every job ends with exactly one
//! [`JobEvent::Finished`] on the [`JobEvents`] stream, after all of its
//! progress events.

use std::any::Any;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::cancel::{CancellationToken, LiveJobs};
use crate::error::{EngineError, OperationError};
use crate::job::{JobEvent, JobId, JobResult, JobSpec, JobState};
use crate::ops::{Operation, ProgressEmitter, Registry};

/// Worker count when none is configured: one per available core.
pub fn default_max_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Receiving end of the engine's event stream.
#[derive(Debug)]
pub struct JobEvents {
    rx: mpsc::UnboundedReceiver<JobEvent>,
}

impl JobEvents {
    /// Next event from any job. `None` once the queue and all its jobs are gone.
    pub async fn recv(&mut self) -> Option<JobEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<JobEvent> {
        self.rx.try_recv().ok()
    }
}

/// State shared between the queue handle and its job tasks.
#[derive(Clone)]
struct Shared {
    live: LiveJobs,
    permits: Arc<Semaphore>,
    events: mpsc::UnboundedSender<JobEvent>,
}

pub struct JobQueue {
    registry: Arc<Registry>,
    shared: Shared,
    runtime: Handle,
    max_workers: usize,
}

impl JobQueue {
    /// Build a queue running at most `max_workers` jobs at once (at least one).
    ///
    /// Must be called from inside a tokio runtime; jobs are spawned onto it.
    pub fn new(registry: Registry, max_workers: usize) -> Result<(Self, JobEvents), EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let max_workers = max_workers.max(1);
        let (tx, rx) = mpsc::unbounded_channel();

        let queue = Self {
            registry: Arc::new(registry),
            shared: Shared {
                live: LiveJobs::new(),
                permits: Arc::new(Semaphore::new(max_workers)),
                events: tx,
            },
            runtime,
            max_workers,
        };
        Ok((queue, JobEvents { rx }))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Queue `spec` and return its id without waiting for it to start.
    ///
    /// Fails only when no operation is registered under `spec.tool_id`; in
    /// that case no job exists and no events follow.
    pub fn submit(&self, spec: JobSpec) -> Result<JobId, EngineError> {
        let operation = self.registry.get(&spec.tool_id)?;
        let job_id = JobId::new();
        let token = self.shared.live.register(job_id);
        let submitted_at = Utc::now();

        info!(
            %job_id,
            tool = %spec.tool_id,
            inputs = spec.inputs.len(),
            "job queued"
        );
        self.runtime.spawn(run_job(
            self.shared.clone(),
            job_id,
            spec,
            operation,
            token,
            submitted_at,
        ));
        Ok(job_id)
    }

    /// Request cancellation. Returns `false` when the job is unknown or already finished.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let found = self.shared.live.cancel(job_id);
        if found {
            info!(%job_id, "cancellation requested");
        } else {
            debug!(%job_id, "cancel ignored: no such live job");
        }
        found
    }

    /// Cancel every live job; returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let count = self.shared.live.cancel_all();
        if count > 0 {
            info!(count, "cancelling all jobs");
        }
        count
    }

    /// Lifecycle state of a live job; `None` once it has finished.
    pub fn state(&self, job_id: JobId) -> Option<JobState> {
        self.shared.live.state(job_id)
    }

    /// Jobs queued or running.
    pub fn active_jobs(&self) -> usize {
        self.shared.live.len()
    }
}

async fn run_job(
    shared: Shared,
    job_id: JobId,
    spec: JobSpec,
    operation: Arc<dyn Operation>,
    token: CancellationToken,
    submitted_at: DateTime<Utc>,
) {
    let result = match Arc::clone(&shared.permits).acquire_owned().await {
        // The permit is held until the blocking work returns.
        Ok(_permit) if !token.is_cancelled() => {
            shared.live.mark_running(job_id);
            debug!(%job_id, tool = %spec.tool_id, "job running");

            let events = shared.events.clone();
            let progress = ProgressEmitter::new(job_id, move |p| {
                let _ = events.send(JobEvent::Progress(p));
            });
            let worker_token = token.clone();
            tokio::task::spawn_blocking(move || {
                execute(operation.as_ref(), &spec, &progress, &worker_token)
            })
            .await
            .unwrap_or_else(|e| contained_fault(job_id, e))
        }
        Ok(_) => {
            debug!(%job_id, "cancelled before start");
            JobResult::cancelled()
        }
        Err(_) => JobResult::failed("job engine shut down"),
    };

    shared.live.unregister(job_id);

    let finished_at = Utc::now();
    let duration_ms = (finished_at - submitted_at).num_milliseconds();
    match JobState::of_result(&result) {
        JobState::Succeeded => info!(
            %job_id,
            outputs = result.outputs.len(),
            duration_ms,
            "job succeeded"
        ),
        JobState::Cancelled => info!(%job_id, duration_ms, "job cancelled"),
        _ => warn!(
            %job_id,
            error = result.error.as_deref().unwrap_or_default(),
            duration_ms,
            "job failed"
        ),
    }

    let _ = shared.events.send(JobEvent::Finished {
        job_id,
        result,
        finished_at,
        duration_ms,
    });
}

/// Validate then run, folding every outcome into a [`JobResult`].
fn execute(
    operation: &dyn Operation,
    spec: &JobSpec,
    progress: &ProgressEmitter,
    token: &CancellationToken,
) -> JobResult {
    if let Err(e) = operation.validate(spec) {
        return JobResult::failed(e.to_string());
    }
    match operation.run(spec, progress, token) {
        Ok(result) => result,
        Err(OperationError::Cancelled) => JobResult::cancelled(),
        Err(e) => {
            let mut result = JobResult::failed(e.to_string());
            result.cancelled = token.is_cancelled();
            result
        }
    }
}

/// A panicking operation fails its own job and nothing else.
fn contained_fault(job_id: JobId, err: JoinError) -> JobResult {
    let detail = if err.is_panic() {
        panic_message(err.into_panic())
    } else {
        err.to_string()
    };
    warn!(%job_id, %detail, "operation aborted");
    JobResult::failed(format!("operation panicked: {detail}"))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown panic".to_string()),
    }
}
