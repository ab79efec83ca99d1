use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    CompressBasic, CompressImages, DeletePages, ImagesToPdf, Merge, Ocr, Operation, PdfToImages,
    PptToPdf, ReorderPages, RotatePages, SplitExtract,
};
use crate::backend::DocumentBackend;
use crate::error::EngineError;

/// Tool id → operation lookup. Built once, then shared read-only by the engine.
#[derive(Clone, Default)]
pub struct Registry {
    operations: BTreeMap<&'static str, Arc<dyn Operation>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in tool, all driven by `backend`.
    pub fn with_defaults(backend: Arc<dyn DocumentBackend>) -> Self {
        Self::new()
            .with(Merge::new(Arc::clone(&backend)))
            .with(SplitExtract::new(Arc::clone(&backend)))
            .with(DeletePages::new(Arc::clone(&backend)))
            .with(RotatePages::new(Arc::clone(&backend)))
            .with(ReorderPages::new(Arc::clone(&backend)))
            .with(CompressBasic::new(Arc::clone(&backend)))
            .with(CompressImages::new(Arc::clone(&backend)))
            .with(PdfToImages::new(Arc::clone(&backend)))
            .with(ImagesToPdf::new(Arc::clone(&backend)))
            .with(PptToPdf::new(Arc::clone(&backend)))
            .with(Ocr::new(backend))
    }

    /// Add `operation`, replacing any earlier one with the same tool id.
    pub fn with(mut self, operation: impl Operation + 'static) -> Self {
        self.operations
            .insert(operation.tool_id(), Arc::new(operation));
        self
    }

    pub fn get(&self, tool_id: &str) -> Result<Arc<dyn Operation>, EngineError> {
        self.operations
            .get(tool_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownTool(tool_id.to_string()))
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.operations.contains_key(tool_id)
    }

    /// Operations sorted by tool id.
    pub fn operations(&self) -> impl Iterator<Item = &dyn Operation> {
        self.operations.values().map(|op| op.as_ref())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
