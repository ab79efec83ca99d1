use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ValidationError;
use crate::job::JobSpec;

/// Inputs and output directory checks shared by every operation.
pub fn validate_io(spec: &JobSpec) -> Result<(), ValidationError> {
    ensure_inputs(&spec.inputs)?;
    ensure_output_dir(&spec.output_dir)
}

/// Every input must exist, be a regular file and open for reading.
pub fn ensure_inputs(inputs: &[PathBuf]) -> Result<(), ValidationError> {
    if inputs.is_empty() {
        return Err(ValidationError::NoInputs);
    }
    for path in inputs {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(ValidationError::Unreadable(path.clone()));
            }
            Err(_) => return Err(ValidationError::InputMissing(path.clone())),
        };
        if !meta.is_file() {
            return Err(ValidationError::NotAFile(path.clone()));
        }
        File::open(path).map_err(|_| ValidationError::Unreadable(path.clone()))?;
    }
    Ok(())
}

/// The output directory must exist and accept new files.
pub fn ensure_output_dir(dir: &Path) -> Result<(), ValidationError> {
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(ValidationError::OutputNotDirectory(dir.to_path_buf())),
        Err(_) => return Err(ValidationError::OutputDirMissing(dir.to_path_buf())),
    }
    // Unnamed temp file: gone as soon as the handle drops.
    tempfile::tempfile_in(dir)
        .map(drop)
        .map_err(|_| ValidationError::OutputNotWritable(dir.to_path_buf()))
}

/// Every input's extension must be one of `allowed` (lowercase, no dot).
pub fn ensure_extensions(inputs: &[PathBuf], allowed: &[&str]) -> Result<(), ValidationError> {
    for path in inputs {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !allowed.contains(&ext.as_str()) {
            return Err(ValidationError::UnsupportedFileType {
                name: super::display_name(path),
            });
        }
    }
    Ok(())
}
