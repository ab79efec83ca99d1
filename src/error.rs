use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::backend::BackendError;
use crate::range::RangeParseError;

/// Application-level failures outside any single job.
#[derive(Debug, Error)]
pub enum ToolboxError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration errors raised synchronously by the engine.
///
/// No job exists when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("job engine must be created inside a tokio runtime")]
    NoRuntime,
}

/// Bad or missing inputs, output directory or parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no input files selected")]
    NoInputs,

    #[error("file does not exist: {}", .0.display())]
    InputMissing(PathBuf),

    #[error("not a file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("no read permission: {}", .0.display())]
    Unreadable(PathBuf),

    #[error("output directory does not exist: {}", .0.display())]
    OutputDirMissing(PathBuf),

    #[error("output path is not a directory: {}", .0.display())]
    OutputNotDirectory(PathBuf),

    #[error("no write permission: {}", .0.display())]
    OutputNotWritable(PathBuf),

    #[error("unsupported file type: {name}")]
    UnsupportedFileType { name: String },

    #[error("invalid value for `{name}`: {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("invalid page range: {0}")]
    PageRange(#[from] RangeParseError),

    #[error("page order must list every page exactly once ({given} of {total} pages given)")]
    IncompleteOrder { given: usize, total: usize },

    #[error("cannot delete every page of {}", .0.display())]
    DeletesAllPages(PathBuf),

    #[error("choose at least one OCR output (output_pdf or output_docx)")]
    NoOcrOutput,
}

impl ValidationError {
    pub fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParam {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Everything `Operation::run` may fail with. The Display text is what the user sees.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("invalid page range: {0}")]
    Range(#[from] RangeParseError),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("{}", describe_io(.0))]
    Io(#[from] io::Error),
}

/// Turn an I/O error into a message a user can act on.
pub fn describe_io(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::PermissionDenied => format!("permission denied: {err}"),
        io::ErrorKind::NotFound => format!("file not found: {err}"),
        io::ErrorKind::IsADirectory => format!("expected a file but found a directory: {err}"),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_errors_are_prefixed() {
        let err = OperationError::from(RangeParseError::Empty);
        assert_eq!(err.to_string(), "invalid page range: range empty");
    }

    #[test]
    fn validation_errors_pass_through() {
        let err = OperationError::from(ValidationError::NoInputs);
        assert_eq!(err.to_string(), "no input files selected");
    }

    #[test]
    fn io_errors_are_described_by_kind() {
        let err = OperationError::from(io::Error::new(io::ErrorKind::PermissionDenied, "out.pdf"));
        assert_eq!(err.to_string(), "permission denied: out.pdf");
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::UnknownTool("frobnicate".into());
        assert_eq!(err.to_string(), "unknown tool: frobnicate");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OperationError>();
        assert_send_sync::<ToolboxError>();
    }
}
