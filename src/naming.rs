//! Output file naming.
//!
//! [`build_output_path`] derives a candidate from the input name and the
//! tool's suffix; [`resolve_output_path`] steers around files that already
//! exist unless overwriting was asked for. Resolution happens right before
//! each file is written, not up front for the whole job.

use std::path::{Path, PathBuf};

/// Highest `_N` tried before giving up and returning the colliding candidate.
pub const MAX_COLLISION_SUFFIX: u32 = 999;

const HOSTILE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Strip path-hostile characters and surrounding whitespace from a file stem.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| !HOSTILE_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Naming inputs shared by every output a tool writes.
#[derive(Debug, Clone, Default)]
pub struct OutputName<'a> {
    /// Appended to the stem, e.g. `_merged` or `_p3`.
    pub suffix: &'a str,
    /// Replaces the input stem when set.
    pub base_name: Option<&'a str>,
    /// Extension including the dot. Defaults to the input's own extension.
    pub ext: Option<&'a str>,
    /// Inserted as `_<index>` between the stem and the suffix.
    pub index: Option<usize>,
}

impl<'a> OutputName<'a> {
    pub fn new(suffix: &'a str) -> Self {
        Self {
            suffix,
            ..Default::default()
        }
    }

    pub fn base_name(mut self, base_name: Option<&'a str>) -> Self {
        self.base_name = base_name.filter(|name| !name.trim().is_empty());
        self
    }

    pub fn ext(mut self, ext: &'a str) -> Self {
        self.ext = Some(ext);
        self
    }

    pub fn index(mut self, index: Option<usize>) -> Self {
        self.index = index;
        self
    }
}

/// Compose the naive candidate path, without looking at the filesystem.
pub fn build_output_path(input: &Path, output_dir: &Path, name: &OutputName<'_>) -> PathBuf {
    let input_stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut stem = name.base_name.map(str::to_string).unwrap_or(input_stem);
    if let Some(index) = name.index {
        stem = format!("{stem}_{index}");
    }
    let stem = sanitize_file_name(&format!("{stem}{}", name.suffix));

    let ext = match name.ext {
        Some(ext) => ext.to_string(),
        None => input
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    };
    output_dir.join(format!("{stem}{ext}"))
}

/// Resolve the path a new output should be written to.
///
/// With `overwrite` the candidate is returned as is. Otherwise the first free
/// name among `stem.ext`, `stem_1.ext` … `stem_999.ext` wins. If all of those
/// exist the original candidate comes back: this is best-effort
/// de-duplication, not a uniqueness guarantee.
pub fn resolve_output_path(
    input: &Path,
    output_dir: &Path,
    name: &OutputName<'_>,
    overwrite: bool,
) -> PathBuf {
    let candidate = build_output_path(input, output_dir, name);
    if overwrite || !candidate.exists() {
        return candidate;
    }

    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = candidate
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1..=MAX_COLLISION_SUFFIX)
        .map(|i| candidate.with_file_name(format!("{stem}_{i}{ext}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
