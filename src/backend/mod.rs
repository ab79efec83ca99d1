//! Boundary to the document-manipulation algorithms.
//!
//! Operations decide *what* to do with which pages and when to stop; a
//! [`DocumentBackend`] does the actual copying, rasterising, recognising and
//! converting. Every method is blocking and counts as one unit of work.

mod command;
mod error;
#[cfg(test)]
pub(crate) mod fake;

use std::path::{Path, PathBuf};

pub use command::{CommandBackend, ToolPaths};
pub use error::BackendError;

/// Extra clockwise rotation applied to a page on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            90 => Some(Self::Quarter),
            180 => Some(Self::Half),
            270 => Some(Self::ThreeQuarter),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::Quarter => 90,
            Self::Half => 180,
            Self::ThreeQuarter => 270,
        }
    }
}

/// One page of an existing document, placed into a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub source: PathBuf,
    /// Zero-based page index within `source`.
    pub index: usize,
    pub rotation: Option<Rotation>,
}

impl PageRef {
    pub fn new(source: impl Into<PathBuf>, index: usize) -> Self {
        Self {
            source: source.into(),
            index,
            rotation: None,
        }
    }

    pub fn rotated(mut self, rotation: Option<Rotation>) -> Self {
        self.rotation = rotation;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    pub linearize: bool,
    pub recompress_streams: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg { quality: u8 },
}

impl ImageFormat {
    /// Canonical extension, with the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => ".png",
            Self::Jpeg { .. } => ".jpg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    pub dpi: u32,
    pub format: ImageFormat,
    pub grayscale: bool,
    /// Cap on the longer edge in pixels.
    pub max_side: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    /// Each page takes the size of its image at the image's own resolution.
    Fit,
}

impl PageSize {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a4" => Some(Self::A4),
            "letter" => Some(Self::Letter),
            "fit" => Some(Self::Fit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOptions {
    pub dpi: u32,
    /// Tesseract language spec, e.g. `chi_sim+eng`.
    pub lang: String,
}

/// The document algorithms the operations are built on.
pub trait DocumentBackend: Send + Sync {
    fn page_count(&self, source: &Path) -> Result<usize, BackendError>;

    /// Write a new PDF made of `pages`, in order.
    fn assemble(&self, pages: &[PageRef], dest: &Path) -> Result<(), BackendError>;

    /// Re-save `source` to `dest` with structural compression options.
    fn rewrite(
        &self,
        source: &Path,
        dest: &Path,
        options: &RewriteOptions,
    ) -> Result<(), BackendError>;

    fn render_page(
        &self,
        source: &Path,
        index: usize,
        options: &RasterOptions,
        dest: &Path,
    ) -> Result<(), BackendError>;

    /// One page per image, in order.
    fn images_to_pdf(
        &self,
        images: &[PathBuf],
        page_size: PageSize,
        dest: &Path,
    ) -> Result<(), BackendError>;

    fn convert_presentation(&self, source: &Path, dest: &Path) -> Result<(), BackendError>;

    /// Recognise the text of one page. When `pdf_dest` is given, also write a
    /// one-page searchable PDF there.
    fn ocr_page(
        &self,
        source: &Path,
        index: usize,
        options: &OcrOptions,
        pdf_dest: Option<&Path>,
    ) -> Result<String, BackendError>;

    /// Write a word-processor document with one page per entry.
    fn write_text_document(&self, pages: &[String], dest: &Path) -> Result<(), BackendError>;
}
