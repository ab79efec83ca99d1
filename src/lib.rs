//! Cancellable document-processing jobs.
//!
//! A [`JobSpec`](job::JobSpec) names a tool from the [`Registry`](ops::Registry);
//! the [`JobQueue`](engine::JobQueue) runs it on a worker, streams progress and
//! delivers exactly one result. Page ranges ([`range`]) and output names
//! ([`naming`]) are shared by every tool.

pub mod backend;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod naming;
pub mod ops;
pub mod presets;
pub mod range;
