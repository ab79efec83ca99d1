//! In-memory backend for tests: records every call and writes small marker files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use super::{
    BackendError, DocumentBackend, OcrOptions, PageRef, PageSize, RasterOptions, RewriteOptions,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    PageCount(PathBuf),
    Assemble { pages: Vec<PageRef>, dest: PathBuf },
    Rewrite { source: PathBuf, dest: PathBuf, options: RewriteOptions },
    Render { source: PathBuf, index: usize, options: RasterOptions, dest: PathBuf },
    ImagesToPdf { images: Vec<PathBuf>, page_size: PageSize, dest: PathBuf },
    ConvertPresentation { source: PathBuf, dest: PathBuf },
    Ocr { source: PathBuf, index: usize, options: OcrOptions, pdf_dest: Option<PathBuf> },
    TextDocument { pages: Vec<String>, dest: PathBuf },
}

#[derive(Default)]
pub struct FakeBackend {
    page_counts: HashMap<PathBuf, usize>,
    default_pages: usize,
    delay: Duration,
    fail_with: Option<String>,
    output_bytes: usize,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            default_pages: 3,
            output_bytes: 16,
            ..Default::default()
        }
    }

    pub fn with_pages(mut self, source: impl Into<PathBuf>, pages: usize) -> Self {
        self.page_counts.insert(source.into(), pages);
        self
    }

    pub fn with_default_pages(mut self, pages: usize) -> Self {
        self.default_pages = pages;
        self
    }

    /// Sleep this long in every call, to make cancellation windows observable.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every document-producing call fail.
    pub fn failing(mut self, stderr: &str) -> Self {
        self.fail_with = Some(stderr.to_string());
        self
    }

    /// Size of the files written for outputs.
    pub fn with_output_bytes(mut self, bytes: usize) -> Self {
        self.output_bytes = bytes;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), BackendError> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(stderr) => Err(BackendError::ToolFailed {
                tool: "fake".into(),
                status: "exit status: 2".into(),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }

    fn write(&self, dest: &Path) -> Result<(), BackendError> {
        fs::write(dest, vec![b'x'; self.output_bytes])?;
        Ok(())
    }
}

impl DocumentBackend for FakeBackend {
    fn page_count(&self, source: &Path) -> Result<usize, BackendError> {
        self.calls.lock().unwrap().push(Call::PageCount(source.to_path_buf()));
        Ok(self
            .page_counts
            .get(source)
            .copied()
            .unwrap_or(self.default_pages))
    }

    fn assemble(&self, pages: &[PageRef], dest: &Path) -> Result<(), BackendError> {
        self.record(Call::Assemble {
            pages: pages.to_vec(),
            dest: dest.to_path_buf(),
        })?;
        self.write(dest)
    }

    fn rewrite(
        &self,
        source: &Path,
        dest: &Path,
        options: &RewriteOptions,
    ) -> Result<(), BackendError> {
        self.record(Call::Rewrite {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
            options: *options,
        })?;
        self.write(dest)
    }

    fn render_page(
        &self,
        source: &Path,
        index: usize,
        options: &RasterOptions,
        dest: &Path,
    ) -> Result<(), BackendError> {
        self.record(Call::Render {
            source: source.to_path_buf(),
            index,
            options: *options,
            dest: dest.to_path_buf(),
        })?;
        self.write(dest)
    }

    fn images_to_pdf(
        &self,
        images: &[PathBuf],
        page_size: PageSize,
        dest: &Path,
    ) -> Result<(), BackendError> {
        self.record(Call::ImagesToPdf {
            images: images.to_vec(),
            page_size,
            dest: dest.to_path_buf(),
        })?;
        self.write(dest)
    }

    fn convert_presentation(&self, source: &Path, dest: &Path) -> Result<(), BackendError> {
        self.record(Call::ConvertPresentation {
            source: source.to_path_buf(),
            dest: dest.to_path_buf(),
        })?;
        self.write(dest)
    }

    fn ocr_page(
        &self,
        source: &Path,
        index: usize,
        options: &OcrOptions,
        pdf_dest: Option<&Path>,
    ) -> Result<String, BackendError> {
        self.record(Call::Ocr {
            source: source.to_path_buf(),
            index,
            options: options.clone(),
            pdf_dest: pdf_dest.map(Path::to_path_buf),
        })?;
        if let Some(pdf_dest) = pdf_dest {
            self.write(pdf_dest)?;
        }
        Ok(format!("text of page {}", index + 1))
    }

    fn write_text_document(&self, pages: &[String], dest: &Path) -> Result<(), BackendError> {
        self.record(Call::TextDocument {
            pages: pages.to_vec(),
            dest: dest.to_path_buf(),
        })?;
        self.write(dest)
    }
}
