//! Configuration loaded from `pdf-toolbox.toml`.
//!
//! [`ToolboxConfig`] holds everything a run can tune. Keys missing from the
//! file fall back to defaults, and a missing file means all defaults.
//! `PDF_TOOLBOX_MAX_WORKERS` and `TESSERACT_CMD` take precedence over the file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::ToolPaths;
use crate::engine::default_max_workers;
use crate::error::ToolboxError;

pub const DEFAULT_CONFIG_FILE: &str = "pdf-toolbox.toml";

const MAX_WORKERS_ENV: &str = "PDF_TOOLBOX_MAX_WORKERS";
const TESSERACT_ENV: &str = "TESSERACT_CMD";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolboxConfig {
    /// Jobs allowed to run at once.
    pub max_workers: usize,

    /// Where outputs go when the command line doesn't say.
    pub output_dir: Option<PathBuf>,

    /// JSON preset file.
    pub presets: Option<PathBuf>,

    /// External programs behind the document backend.
    pub tools: ToolPaths,
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            output_dir: None,
            presets: None,
            tools: ToolPaths::default(),
        }
    }
}

impl ToolboxConfig {
    /// Load from `path`, or from `pdf-toolbox.toml` in the working directory.
    ///
    /// An explicitly given file must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ToolboxError> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };
        let mut config = if path.exists() {
            Self::from_toml_str(&std::fs::read_to_string(path)?)?
        } else if required {
            return Err(ToolboxError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        } else {
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ToolboxError> {
        let config: Self = toml::from_str(contents)?;
        if config.max_workers == 0 {
            return Err(ToolboxError::Config("max_workers must be at least 1".into()));
        }
        Ok(config)
    }

    /// Apply environment overrides, read through `var`.
    pub fn apply_overrides(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ToolboxError> {
        if let Some(raw) = var(MAX_WORKERS_ENV)
            && !raw.trim().is_empty()
        {
            self.max_workers = raw
                .trim()
                .parse()
                .ok()
                .filter(|n: &usize| *n > 0)
                .ok_or_else(|| {
                    ToolboxError::Config(format!(
                        "{MAX_WORKERS_ENV} must be a positive number, got {raw:?}"
                    ))
                })?;
        }
        if let Some(cmd) = var(TESSERACT_ENV)
            && !cmd.trim().is_empty()
        {
            self.tools.tesseract = PathBuf::from(cmd.trim());
        }
        Ok(())
    }
}
