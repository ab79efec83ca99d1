//! Page-level tools: merge, split/extract, delete, rotate and reorder.
//!
//! Each tool first asks the backend for page counts (cheap) so that progress
//! totals cover the whole job, then walks the pages one at a time with a
//! cancellation checkpoint before each.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{Operation, ProgressEmitter, checkpoint, display_name, output_path, validate_io};
use crate::backend::{DocumentBackend, PageRef, Rotation};
use crate::cancel::CancellationToken;
use crate::error::{OperationError, ValidationError};
use crate::job::{JobResult, JobSpec};
use crate::naming::OutputName;
use crate::range::{page_spans, parse_page_range};

/// Pages picked from one input.
struct Selection<'a> {
    source: &'a Path,
    /// 1-based position in the job's input list.
    position: usize,
    pages: Vec<usize>,
}

/// Count pages of every input and pick pages from each with `select`.
fn plan<'a>(
    backend: &dyn DocumentBackend,
    spec: &'a JobSpec,
    token: &CancellationToken,
    mut select: impl FnMut(&Path, usize) -> Result<Vec<usize>, OperationError>,
) -> Result<Vec<Selection<'a>>, OperationError> {
    let mut selections = Vec::with_capacity(spec.inputs.len());
    for (i, source) in spec.inputs.iter().enumerate() {
        checkpoint(token)?;
        let page_count = backend.page_count(source)?;
        let pages = select(source, page_count)?;
        selections.push(Selection {
            source,
            position: i + 1,
            pages,
        });
    }
    Ok(selections)
}

fn total_pages(selections: &[Selection<'_>]) -> usize {
    selections.iter().map(|s| s.pages.len()).sum()
}

fn require_param(spec: &JobSpec, key: &str) -> Result<String, ValidationError> {
    let value = spec.params.str_or(key, "")?;
    if value.trim().is_empty() {
        return Err(ValidationError::invalid_param(key, "required"));
    }
    Ok(value)
}

/// Syntax-only check of a range parameter; bounds are checked per input at run time.
fn validate_range_param(spec: &JobSpec, key: &str) -> Result<(), ValidationError> {
    page_spans(&require_param(spec, key)?, None)?;
    Ok(())
}

/// Rebuild each input from its selected pages, one output per input.
///
/// With `indexed`, a custom name shared by several inputs gets the input's
/// position inserted so the outputs stay apart.
#[allow(clippy::too_many_arguments)]
fn write_per_input(
    backend: &dyn DocumentBackend,
    spec: &JobSpec,
    selections: &[Selection<'_>],
    suffix: impl Fn(&Selection<'_>) -> String,
    indexed: bool,
    progress: &ProgressEmitter,
    token: &CancellationToken,
    mut page_ref: impl FnMut(&Selection<'_>, usize) -> PageRef,
) -> Result<Vec<PathBuf>, OperationError> {
    let total = total_pages(selections);
    let mut current = 0;
    let mut outputs = Vec::with_capacity(selections.len());

    for selection in selections {
        let mut pages = Vec::with_capacity(selection.pages.len());
        for &index in &selection.pages {
            checkpoint(token)?;
            pages.push(page_ref(selection, index));
            current += 1;
            progress.emit(
                "processing",
                current,
                total,
                format!("{} page {}", display_name(selection.source), index + 1),
            );
        }

        checkpoint(token)?;
        let name_suffix = suffix(selection);
        let index = if indexed {
            spec.name_index(selection.position)
        } else {
            None
        };
        let dest = output_path(
            spec,
            selection.source,
            &OutputName::new(&name_suffix)
                .base_name(spec.output_name.as_deref())
                .ext(".pdf")
                .index(index),
        );
        backend.assemble(&pages, &dest)?;
        debug!(output = %dest.display(), pages = pages.len(), "wrote document");
        outputs.push(dest);
    }
    Ok(outputs)
}

/// Concatenate every page of every input, in input order, into one PDF.
pub struct Merge {
    backend: Arc<dyn DocumentBackend>,
}

impl Merge {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

impl Operation for Merge {
    fn tool_id(&self) -> &'static str {
        "merge"
    }

    fn display_name(&self) -> &'static str {
        "Merge PDFs"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        spec.params.bool_or("keep_bookmarks", false)?;
        Ok(())
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let keep_bookmarks = spec.params.bool_or("keep_bookmarks", false)?;
        let selections = plan(self.backend.as_ref(), spec, token, |_, count| {
            Ok((0..count).collect())
        })?;
        let total = total_pages(&selections);

        let mut pages = Vec::with_capacity(total);
        for selection in &selections {
            for &index in &selection.pages {
                checkpoint(token)?;
                pages.push(PageRef::new(selection.source, index));
                progress.emit(
                    "processing",
                    pages.len(),
                    total,
                    format!("adding {}", display_name(selection.source)),
                );
            }
        }

        checkpoint(token)?;
        let first = spec.inputs.first().ok_or(ValidationError::NoInputs)?;
        progress.emit("writing", 0, 1, "writing merged document");
        let dest = output_path(
            spec,
            first,
            &OutputName::new("_merged")
                .base_name(spec.output_name.as_deref())
                .ext(".pdf"),
        );
        self.backend.assemble(&pages, &dest)?;
        progress.emit("writing", 1, 1, "write complete");

        let result = JobResult::succeeded(vec![dest]);
        Ok(if keep_bookmarks {
            result.with_warning("bookmarks are not carried over into the merged document")
        } else {
            result
        })
    }
}

/// Pull the pages named by `ranges` out of each input, either into one
/// document per input (`extract_one`) or one document per page (`split_many`).
pub struct SplitExtract {
    backend: Arc<dyn DocumentBackend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitMode {
    ExtractOne,
    SplitMany,
}

impl SplitMode {
    fn from_params(spec: &JobSpec) -> Result<Self, ValidationError> {
        match spec.params.str_or("mode", "extract_one")?.as_str() {
            "extract_one" => Ok(Self::ExtractOne),
            "split_many" => Ok(Self::SplitMany),
            other => Err(ValidationError::invalid_param(
                "mode",
                format!("expected extract_one or split_many, got {other}"),
            )),
        }
    }
}

impl SplitExtract {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

impl Operation for SplitExtract {
    fn tool_id(&self) -> &'static str {
        "split_extract"
    }

    fn display_name(&self) -> &'static str {
        "Split / Extract Pages"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        SplitMode::from_params(spec)?;
        validate_range_param(spec, "ranges")
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let mode = SplitMode::from_params(spec)?;
        let ranges = require_param(spec, "ranges")?;
        let selections = plan(self.backend.as_ref(), spec, token, |_, count| {
            Ok(parse_page_range(&ranges, Some(count))?)
        })?;

        if mode == SplitMode::ExtractOne {
            let single = spec.inputs.len() == 1;
            let outputs = write_per_input(
                self.backend.as_ref(),
                spec,
                &selections,
                |s| {
                    if single {
                        "_extract".to_string()
                    } else {
                        format!("_extract_{}", s.position)
                    }
                },
                false,
                progress,
                token,
                |s, index| PageRef::new(s.source, index),
            )?;
            return Ok(JobResult::succeeded(outputs));
        }

        let total = total_pages(&selections);
        let mut current = 0;
        let mut outputs = Vec::with_capacity(total);
        for selection in &selections {
            for &index in &selection.pages {
                checkpoint(token)?;
                let suffix = format!("_p{}", index + 1);
                let dest = output_path(
                    spec,
                    selection.source,
                    &OutputName::new(&suffix).ext(".pdf"),
                );
                self.backend
                    .assemble(&[PageRef::new(selection.source, index)], &dest)?;
                outputs.push(dest);
                current += 1;
                progress.emit(
                    "processing",
                    current,
                    total,
                    format!("{} page {}", display_name(selection.source), index + 1),
                );
            }
        }
        Ok(JobResult::succeeded(outputs))
    }
}

/// Drop the pages named by `ranges` from each input.
pub struct DeletePages {
    backend: Arc<dyn DocumentBackend>,
}

impl DeletePages {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

impl Operation for DeletePages {
    fn tool_id(&self) -> &'static str {
        "delete_pages"
    }

    fn display_name(&self) -> &'static str {
        "Delete Pages"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        validate_range_param(spec, "ranges")
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let ranges = require_param(spec, "ranges")?;
        let selections = plan(self.backend.as_ref(), spec, token, |source, count| {
            let doomed: HashSet<usize> = parse_page_range(&ranges, Some(count))?
                .into_iter()
                .collect();
            if doomed.len() >= count {
                return Err(ValidationError::DeletesAllPages(source.to_path_buf()).into());
            }
            Ok((0..count).filter(|i| !doomed.contains(i)).collect())
        })?;

        let outputs = write_per_input(
            self.backend.as_ref(),
            spec,
            &selections,
            |_| "_deleted".to_string(),
            true,
            progress,
            token,
            |s, index| PageRef::new(s.source, index),
        )?;
        Ok(JobResult::succeeded(outputs))
    }
}

/// Rotate the pages named by `ranges` clockwise by `angle`; other pages are kept as is.
pub struct RotatePages {
    backend: Arc<dyn DocumentBackend>,
}

fn rotation_param(spec: &JobSpec) -> Result<Rotation, ValidationError> {
    let degrees = spec.params.u32_or("angle", 90)?;
    Rotation::from_degrees(degrees).ok_or_else(|| {
        ValidationError::invalid_param("angle", format!("must be 90, 180 or 270, got {degrees}"))
    })
}

impl RotatePages {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

impl Operation for RotatePages {
    fn tool_id(&self) -> &'static str {
        "rotate_pages"
    }

    fn display_name(&self) -> &'static str {
        "Rotate Pages"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        rotation_param(spec)?;
        validate_range_param(spec, "ranges")
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let rotation = rotation_param(spec)?;
        let ranges = require_param(spec, "ranges")?;

        let mut targets: Vec<HashSet<usize>> = Vec::with_capacity(spec.inputs.len());
        let selections = plan(self.backend.as_ref(), spec, token, |_, count| {
            targets.push(parse_page_range(&ranges, Some(count))?.into_iter().collect());
            Ok((0..count).collect())
        })?;

        let outputs = write_per_input(
            self.backend.as_ref(),
            spec,
            &selections,
            |_| "_rotated".to_string(),
            true,
            progress,
            token,
            |s, index| {
                let rotate = targets[s.position - 1].contains(&index);
                PageRef::new(s.source, index).rotated(rotate.then_some(rotation))
            },
        )?;
        Ok(JobResult::succeeded(outputs))
    }
}

/// Rewrite each input with its pages in the order given by `order`, which
/// must name every page exactly once.
pub struct ReorderPages {
    backend: Arc<dyn DocumentBackend>,
}

impl ReorderPages {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

impl Operation for ReorderPages {
    fn tool_id(&self) -> &'static str {
        "reorder_pages"
    }

    fn display_name(&self) -> &'static str {
        "Reorder Pages"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        validate_range_param(spec, "order")
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let order = require_param(spec, "order")?;
        let selections = plan(self.backend.as_ref(), spec, token, |_, count| {
            // Parsing already drops duplicates and rejects pages past the end,
            // so a full-length sequence is a permutation.
            let pages = parse_page_range(&order, Some(count))?;
            if pages.len() != count {
                return Err(ValidationError::IncompleteOrder {
                    given: pages.len(),
                    total: count,
                }
                .into());
            }
            Ok(pages)
        })?;

        let outputs = write_per_input(
            self.backend.as_ref(),
            spec,
            &selections,
            |_| "_reordered".to_string(),
            true,
            progress,
            token,
            |s, index| PageRef::new(s.source, index),
        )?;
        Ok(JobResult::succeeded(outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{Call, FakeBackend};
    use crate::job::JobId;
    use crate::ops::testing::{Workspace, assert_monotonic, recording_emitter, run_op};

    fn assembled(backend: &FakeBackend) -> Vec<(Vec<PageRef>, PathBuf)> {
        backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Assemble { pages, dest } => Some((pages, dest)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn merge_concatenates_in_input_order() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let b = ws.input("b.pdf");
        let backend = Arc::new(FakeBackend::new().with_pages(&a, 2).with_pages(&b, 1));
        let op = Merge::new(backend.clone());

        let result = run_op(&op, &ws.spec("merge", &[&a, &b])).unwrap();

        assert!(result.success);
        assert_eq!(result.outputs, vec![ws.out.join("a_merged.pdf")]);
        assert!(result.warning.is_none());
        let calls = assembled(&backend);
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            vec![PageRef::new(&a, 0), PageRef::new(&a, 1), PageRef::new(&b, 0)]
        );
    }

    #[test]
    fn merge_uses_custom_name_and_warns_about_bookmarks() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let op = Merge::new(Arc::new(FakeBackend::new()));
        let spec = ws
            .spec("merge", &[&a])
            .with_output_name("combined")
            .with_param("keep_bookmarks", true);

        let result = run_op(&op, &spec).unwrap();

        assert_eq!(result.outputs, vec![ws.out.join("combined_merged.pdf")]);
        assert!(result.warning.unwrap().contains("bookmarks"));
    }

    #[test]
    fn merge_progress_is_monotonic_and_complete() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let b = ws.input("b.pdf");
        let op = Merge::new(Arc::new(FakeBackend::new().with_default_pages(4)));
        let (emitter, seen) = recording_emitter();

        op.run(&ws.spec("merge", &[&a, &b]), &emitter, &CancellationToken::new())
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_monotonic(&seen);
        let processing: Vec<_> = seen.iter().filter(|p| p.stage == "processing").collect();
        assert_eq!(processing.len(), 8);
        assert!(processing.iter().all(|p| p.total == 8));
        assert_eq!(seen.last().unwrap().stage, "writing");
    }

    #[test]
    fn merge_stops_when_cancelled() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let backend = Arc::new(FakeBackend::new());
        let op = Merge::new(backend.clone());
        let token = CancellationToken::new();
        token.cancel();

        let err = op
            .run(&ws.spec("merge", &[&a]), &ProgressEmitter::discard(JobId::new()), &token)
            .unwrap_err();

        assert!(matches!(err, OperationError::Cancelled));
        assert!(assembled(&backend).is_empty());
    }

    #[test]
    fn extract_one_writes_one_file_per_input() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let b = ws.input("b.pdf");
        let backend = Arc::new(FakeBackend::new().with_default_pages(5));
        let op = SplitExtract::new(backend.clone());
        let spec = ws.spec("split_extract", &[&a, &b]).with_param("ranges", "2-3");

        let result = run_op(&op, &spec).unwrap();

        assert_eq!(
            result.outputs,
            vec![ws.out.join("a_extract_1.pdf"), ws.out.join("b_extract_2.pdf")]
        );
        let calls = assembled(&backend);
        assert_eq!(calls[0].0, vec![PageRef::new(&a, 1), PageRef::new(&a, 2)]);
    }

    #[test]
    fn extract_single_input_has_plain_suffix() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let op = SplitExtract::new(Arc::new(FakeBackend::new()));
        let spec = ws.spec("split_extract", &[&a]).with_param("ranges", "1");

        let result = run_op(&op, &spec).unwrap();
        assert_eq!(result.outputs, vec![ws.out.join("a_extract.pdf")]);
    }

    #[test]
    fn split_many_writes_one_file_per_page() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let op = SplitExtract::new(Arc::new(FakeBackend::new().with_default_pages(4)));
        let spec = ws
            .spec("split_extract", &[&a])
            .with_param("mode", "split_many")
            .with_param("ranges", "4,1");

        let result = run_op(&op, &spec).unwrap();
        assert_eq!(
            result.outputs,
            vec![ws.out.join("a_p4.pdf"), ws.out.join("a_p1.pdf")]
        );
    }

    #[test]
    fn split_rejects_bad_mode_and_ranges() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let op = SplitExtract::new(Arc::new(FakeBackend::new()));

        let bad_mode = ws
            .spec("split_extract", &[&a])
            .with_param("mode", "shred")
            .with_param("ranges", "1");
        assert!(matches!(
            op.validate(&bad_mode),
            Err(ValidationError::InvalidParam { .. })
        ));

        let bad_range = ws.spec("split_extract", &[&a]).with_param("ranges", "3-1");
        assert!(matches!(
            op.validate(&bad_range),
            Err(ValidationError::PageRange(_))
        ));

        let missing = ws.spec("split_extract", &[&a]);
        assert!(op.validate(&missing).is_err());
    }

    #[test]
    fn split_range_past_end_fails_at_run() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let op = SplitExtract::new(Arc::new(FakeBackend::new().with_default_pages(2)));
        let spec = ws.spec("split_extract", &[&a]).with_param("ranges", "5");

        let err = run_op(&op, &spec).unwrap_err();
        assert_eq!(err.to_string(), "invalid page range: page out of range: 5 > 2");
    }

    #[test]
    fn delete_keeps_remaining_pages() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let backend = Arc::new(FakeBackend::new().with_default_pages(4));
        let op = DeletePages::new(backend.clone());
        let spec = ws.spec("delete_pages", &[&a]).with_param("ranges", "2,4");

        let result = run_op(&op, &spec).unwrap();

        assert_eq!(result.outputs, vec![ws.out.join("a_deleted.pdf")]);
        assert_eq!(
            assembled(&backend)[0].0,
            vec![PageRef::new(&a, 0), PageRef::new(&a, 2)]
        );
    }

    #[test]
    fn delete_refuses_to_empty_a_document() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let op = DeletePages::new(Arc::new(FakeBackend::new().with_default_pages(2)));
        let spec = ws.spec("delete_pages", &[&a]).with_param("ranges", "1-2");

        let err = run_op(&op, &spec).unwrap_err();
        assert!(matches!(
            err,
            OperationError::Validation(ValidationError::DeletesAllPages(_))
        ));
    }

    #[test]
    fn delete_indexes_shared_custom_names() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let b = ws.input("b.pdf");
        let op = DeletePages::new(Arc::new(FakeBackend::new()));
        let spec = ws
            .spec("delete_pages", &[&a, &b])
            .with_output_name("trimmed")
            .with_param("ranges", "1");

        let result = run_op(&op, &spec).unwrap();
        assert_eq!(
            result.outputs,
            vec![
                ws.out.join("trimmed_1_deleted.pdf"),
                ws.out.join("trimmed_2_deleted.pdf")
            ]
        );
    }

    #[test]
    fn rotate_only_touches_selected_pages() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let backend = Arc::new(FakeBackend::new().with_default_pages(3));
        let op = RotatePages::new(backend.clone());
        let spec = ws
            .spec("rotate_pages", &[&a])
            .with_param("ranges", "2")
            .with_param("angle", 180);

        let result = run_op(&op, &spec).unwrap();

        assert_eq!(result.outputs, vec![ws.out.join("a_rotated.pdf")]);
        assert_eq!(
            assembled(&backend)[0].0,
            vec![
                PageRef::new(&a, 0),
                PageRef::new(&a, 1).rotated(Some(Rotation::Half)),
                PageRef::new(&a, 2),
            ]
        );
    }

    #[test]
    fn rotate_rejects_odd_angles() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let op = RotatePages::new(Arc::new(FakeBackend::new()));
        let spec = ws
            .spec("rotate_pages", &[&a])
            .with_param("ranges", "1")
            .with_param("angle", "45");

        let err = op.validate(&spec).unwrap_err();
        assert!(err.to_string().contains("must be 90, 180 or 270"));
    }

    #[test]
    fn rotate_validates_huge_range_without_expanding_it() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let backend = Arc::new(FakeBackend::new().with_default_pages(3));
        let op = RotatePages::new(backend.clone());
        let spec = ws
            .spec("rotate_pages", &[&a])
            .with_param("ranges", "1-4000000000")
            .with_param("angle", 90);

        let started = std::time::Instant::now();
        op.validate(&spec).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let err = run_op(&op, &spec).unwrap_err();
        assert_eq!(err.to_string(), "invalid page range: page out of range: 4 > 3");
        assert!(assembled(&backend).is_empty());
    }

    #[test]
    fn merge_without_inputs_fails_instead_of_panicking() {
        let ws = Workspace::new();
        let op = Merge::new(Arc::new(FakeBackend::new()));
        let spec = ws.spec("merge", &[]);

        let err = op
            .run(&spec, &ProgressEmitter::discard(JobId::new()), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, OperationError::Validation(ValidationError::NoInputs)));
    }

    #[test]
    fn reorder_applies_permutation() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let backend = Arc::new(FakeBackend::new().with_default_pages(3));
        let op = ReorderPages::new(backend.clone());
        let spec = ws.spec("reorder_pages", &[&a]).with_param("order", "3,1-2");

        let result = run_op(&op, &spec).unwrap();

        assert_eq!(result.outputs, vec![ws.out.join("a_reordered.pdf")]);
        assert_eq!(
            assembled(&backend)[0].0,
            vec![PageRef::new(&a, 2), PageRef::new(&a, 0), PageRef::new(&a, 1)]
        );
    }

    #[test]
    fn reorder_requires_every_page() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        let op = ReorderPages::new(Arc::new(FakeBackend::new().with_default_pages(3)));
        let spec = ws.spec("reorder_pages", &[&a]).with_param("order", "3,1,1");

        let err = run_op(&op, &spec).unwrap_err();
        assert!(matches!(
            err,
            OperationError::Validation(ValidationError::IncompleteOrder { given: 2, total: 3 })
        ));
    }

    #[test]
    fn existing_output_is_not_clobbered() {
        let ws = Workspace::new();
        let a = ws.input("a.pdf");
        std::fs::write(ws.out.join("a_reordered.pdf"), b"keep me").unwrap();
        let op = ReorderPages::new(Arc::new(FakeBackend::new().with_default_pages(1)));
        let spec = ws.spec("reorder_pages", &[&a]).with_param("order", "1");

        let result = run_op(&op, &spec).unwrap();

        assert_eq!(result.outputs, vec![ws.out.join("a_reordered_1.pdf")]);
        assert_eq!(
            std::fs::read(ws.out.join("a_reordered.pdf")).unwrap(),
            b"keep me"
        );
    }
}
