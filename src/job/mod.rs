mod model;
mod state;

pub use model::{CANCELLED_MESSAGE, JobEvent, JobId, JobProgress, JobResult, JobSpec, Params};
pub use state::JobState;
