//! Operations: the units of work the engine runs.
//!
//! An [`Operation`] validates a [`JobSpec`] and then runs it on a worker
//! thread, reporting progress through a [`ProgressEmitter`] and polling a
//! [`CancellationToken`] between units of work. Operations never talk to the
//! engine directly and never write a [`JobResult`] for cancellation
//! themselves: they return [`OperationError::Cancelled`] and the engine turns
//! that into the cancelled result.

mod compress;
mod convert;
mod ocr;
mod pages;
mod registry;
mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use compress::{CompressBasic, CompressImages};
pub use convert::{ImagesToPdf, PdfToImages, PptToPdf};
pub use ocr::Ocr;
pub use pages::{DeletePages, Merge, ReorderPages, RotatePages, SplitExtract};
pub use registry::Registry;
pub use validate::{ensure_extensions, ensure_inputs, ensure_output_dir, validate_io};

use crate::cancel::CancellationToken;
use crate::error::{OperationError, ValidationError};
use crate::job::{JobId, JobProgress, JobResult, JobSpec};
use crate::naming::{OutputName, resolve_output_path};

/// A named, self-validating document transformation.
pub trait Operation: Send + Sync {
    /// Registry key, e.g. `merge`.
    fn tool_id(&self) -> &'static str;

    /// Human-readable name.
    fn display_name(&self) -> &'static str;

    /// Check inputs, output directory and parameters before any work starts.
    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)
    }

    /// Do the work. Must return [`OperationError::Cancelled`] promptly once
    /// `token` is cancelled.
    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError>;
}

type ProgressSink = Arc<dyn Fn(JobProgress) + Send + Sync>;

/// Hands progress reports for one job to whoever listens.
#[derive(Clone)]
pub struct ProgressEmitter {
    job_id: JobId,
    sink: ProgressSink,
}

impl ProgressEmitter {
    pub fn new(job_id: JobId, sink: impl Fn(JobProgress) + Send + Sync + 'static) -> Self {
        Self {
            job_id,
            sink: Arc::new(sink),
        }
    }

    /// An emitter that drops everything.
    pub fn discard(job_id: JobId) -> Self {
        Self::new(job_id, |_| {})
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn emit(&self, stage: &str, current: usize, total: usize, message: impl Into<String>) {
        (self.sink)(JobProgress {
            job_id: self.job_id,
            stage: stage.to_string(),
            current: current as u64,
            total: total as u64,
            message: message.into(),
        });
    }
}

impl std::fmt::Debug for ProgressEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressEmitter")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

/// Bail out with [`OperationError::Cancelled`] if the job was cancelled.
pub fn checkpoint(token: &CancellationToken) -> Result<(), OperationError> {
    if token.is_cancelled() {
        Err(OperationError::Cancelled)
    } else {
        Ok(())
    }
}

/// Pick the path for a new output of `spec`, derived from `input`.
pub(crate) fn output_path(spec: &JobSpec, input: &Path, name: &OutputName<'_>) -> PathBuf {
    resolve_output_path(input, &spec.output_dir, name, spec.overwrite)
}

/// File name of `path` for progress messages.
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_observes_cancellation() {
        let token = CancellationToken::new();
        assert!(checkpoint(&token).is_ok());
        token.cancel();
        assert!(matches!(checkpoint(&token), Err(OperationError::Cancelled)));
    }

    #[test]
    fn emitter_stamps_job_id() {
        let (emitter, seen) = testing::recording_emitter();
        emitter.emit("processing", 2, 5, "page 2");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].job_id, emitter.job_id());
        assert_eq!(seen[0].current, 2);
        assert_eq!(seen[0].total, 5);
        assert_eq!(seen[0].message, "page 2");
    }

    #[test]
    fn display_name_is_file_name() {
        assert_eq!(display_name(Path::new("/tmp/in/report.pdf")), "report.pdf");
    }
}
