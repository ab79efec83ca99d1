//! Failures reported by a [`DocumentBackend`](super::DocumentBackend).

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The external program could not be started at all.
    #[error("required tool `{tool}` is not installed or not on PATH")]
    MissingTool { tool: String },

    #[error("document is encrypted or password protected: {detail}")]
    Encrypted { detail: String },

    /// The program ran and exited unsuccessfully.
    #[error("`{tool}` failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("`{tool}` produced unexpected output: {output}")]
    UnexpectedOutput { tool: String, output: String },

    #[error("nothing to write: no pages selected")]
    EmptyDocument,

    #[error("{}", crate::error::describe_io(.0))]
    Io(#[from] io::Error),
}
