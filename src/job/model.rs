use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ValidationError;

/// Message attached to every cancelled result.
pub const CANCELLED_MESSAGE: &str = "operation cancelled";

/// Unique id of a submitted job. Displayed as 32 hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Free-form, per-tool parameters. The engine never looks inside.
///
/// Values are JSON so presets can carry real numbers and booleans; the typed
/// getters also accept string spellings because the CLI only has strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Set `key` from raw text: JSON scalars (`true`, `300`) keep their type,
    /// anything else is stored as a string.
    pub fn insert_raw(&mut self, key: &str, raw: &str) {
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(v @ (Value::Bool(_) | Value::Number(_))) => v,
            _ => Value::String(raw.to_string()),
        };
        self.0.insert(key.to_string(), value);
    }

    /// Fill in keys from `defaults` that are not already set.
    pub fn merge_defaults(&mut self, defaults: &Params) {
        for (key, value) in &defaults.0 {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn str_or(&self, key: &str, default: &str) -> Result<String, ValidationError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(ValidationError::invalid_param(
                key,
                format!("expected text, got {other}"),
            )),
        }
    }

    pub fn u32_or(&self, key: &str, default: u32) -> Result<u32, ValidationError> {
        let invalid = |v: &dyn fmt::Display| {
            ValidationError::invalid_param(key, format!("expected a whole number, got {v}"))
        };
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid(n)),
            Some(Value::String(s)) => s.trim().parse().map_err(|_| invalid(s)),
            Some(other) => Err(invalid(other)),
        }
    }

    /// Like [`u32_or`](Self::u32_or) but the value must fall inside `range`.
    pub fn u32_in(
        &self,
        key: &str,
        default: u32,
        range: RangeInclusive<u32>,
    ) -> Result<u32, ValidationError> {
        let value = self.u32_or(key, default)?;
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(ValidationError::invalid_param(
                key,
                format!("{value} is outside {}..={}", range.start(), range.end()),
            ))
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ValidationError> {
        let invalid = |v: &dyn fmt::Display| {
            ValidationError::invalid_param(key, format!("expected true or false, got {v}"))
        };
        match self.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::Number(n)) => match n.as_u64() {
                Some(0) => Ok(false),
                Some(1) => Ok(true),
                _ => Err(invalid(n)),
            },
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" | "" => Ok(false),
                _ => Err(invalid(s)),
            },
            Some(other) => Err(invalid(other)),
        }
    }
}

/// Everything a job needs, fixed at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Registry key of the operation to run.
    pub tool_id: String,
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    /// Replaces the input stem in output names.
    #[serde(default)]
    pub output_name: Option<String>,
    #[serde(default)]
    pub params: Params,
    /// Allow replacing existing files instead of picking a free name.
    #[serde(default)]
    pub overwrite: bool,
}

impl JobSpec {
    pub fn new(
        tool_id: impl Into<String>,
        inputs: Vec<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool_id: tool_id.into(),
            inputs,
            output_dir: output_dir.into(),
            output_name: None,
            params: Params::new(),
            overwrite: false,
        }
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Index appended to per-input output names: only when a custom name is
    /// shared by several inputs, so they don't all land on the same candidate.
    pub fn name_index(&self, position: usize) -> Option<usize> {
        (self.output_name.is_some() && self.inputs.len() > 1).then_some(position)
    }
}

/// One progress report. `total == 0` means the amount of work is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: JobId,
    /// Operation-defined label such as `processing` or `writing`.
    pub stage: String,
    pub current: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl JobProgress {
    /// Completion ratio in `0.0..=1.0`, or `None` when indeterminate.
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.current.min(self.total) as f64) / self.total as f64)
    }
}

/// Terminal outcome of a job. Exactly one per job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    /// Files produced. Empty on failure.
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
}

impl JobResult {
    pub fn succeeded(outputs: Vec<PathBuf>) -> Self {
        Self {
            success: true,
            outputs,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn cancelled() -> Self {
        Self {
            error: Some(CANCELLED_MESSAGE.to_string()),
            cancelled: true,
            ..Default::default()
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// What the engine publishes to its subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    Progress(JobProgress),
    Finished {
        job_id: JobId,
        result: JobResult,
        finished_at: DateTime<Utc>,
        duration_ms: i64,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Progress(progress) => progress.job_id,
            JobEvent::Finished { job_id, .. } => *job_id,
        }
    }
}
