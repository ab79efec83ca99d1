//! Format conversions: PDF pages to images, images to a PDF, presentations to PDF.

use std::sync::Arc;

use super::{
    Operation, ProgressEmitter, checkpoint, display_name, ensure_extensions, output_path,
    validate_io,
};
use crate::backend::{DocumentBackend, ImageFormat, PageSize, RasterOptions};
use crate::cancel::CancellationToken;
use crate::error::{OperationError, ValidationError};
use crate::job::{JobResult, JobSpec};
use crate::naming::OutputName;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif", "webp"];
pub const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "pps", "ppsx"];

const EXPORT_JPEG_QUALITY: u8 = 75;

/// One image file per page.
pub struct PdfToImages {
    backend: Arc<dyn DocumentBackend>,
}

impl PdfToImages {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    /// Raster options plus the extension written, which follows the user's spelling.
    fn options(spec: &JobSpec) -> Result<(RasterOptions, String), ValidationError> {
        let dpi = spec.params.u32_in("dpi", 150, 72..=600)?;
        let format = spec.params.str_or("format", "png")?.to_ascii_lowercase();
        let image_format = match format.as_str() {
            "png" => ImageFormat::Png,
            "jpg" | "jpeg" => ImageFormat::Jpeg {
                quality: EXPORT_JPEG_QUALITY,
            },
            other => {
                return Err(ValidationError::invalid_param(
                    "format",
                    format!("expected png or jpg, got {other}"),
                ));
            }
        };
        let options = RasterOptions {
            dpi,
            format: image_format,
            grayscale: false,
            max_side: None,
        };
        Ok((options, format!(".{format}")))
    }
}

impl Operation for PdfToImages {
    fn tool_id(&self) -> &'static str {
        "pdf_to_images"
    }

    fn display_name(&self) -> &'static str {
        "PDF to Images"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        Self::options(spec)?;
        Ok(())
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let (options, ext) = Self::options(spec)?;

        let mut counts = Vec::with_capacity(spec.inputs.len());
        for source in &spec.inputs {
            checkpoint(token)?;
            counts.push(self.backend.page_count(source)?);
        }
        let total: usize = counts.iter().sum();
        let mut outputs = Vec::with_capacity(total);

        for (i, (source, &count)) in spec.inputs.iter().zip(&counts).enumerate() {
            for index in 0..count {
                checkpoint(token)?;
                let suffix = format!("_p{}", index + 1);
                let dest = output_path(
                    spec,
                    source,
                    &OutputName::new(&suffix)
                        .base_name(spec.output_name.as_deref())
                        .ext(&ext)
                        .index(spec.name_index(i + 1)),
                );
                self.backend.render_page(source, index, &options, &dest)?;
                outputs.push(dest);
                progress.emit(
                    "processing",
                    outputs.len(),
                    total,
                    format!("{} page {}", display_name(source), index + 1),
                );
            }
        }
        Ok(JobResult::succeeded(outputs))
    }
}

/// All inputs, in order, as pages of one PDF.
pub struct ImagesToPdf {
    backend: Arc<dyn DocumentBackend>,
}

impl ImagesToPdf {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    fn page_size(spec: &JobSpec) -> Result<PageSize, ValidationError> {
        let value = spec.params.str_or("page_size", "a4")?;
        PageSize::parse(&value).ok_or_else(|| {
            ValidationError::invalid_param(
                "page_size",
                format!("expected a4, letter or fit, got {value}"),
            )
        })
    }
}

impl Operation for ImagesToPdf {
    fn tool_id(&self) -> &'static str {
        "images_to_pdf"
    }

    fn display_name(&self) -> &'static str {
        "Images to PDF"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        ensure_extensions(&spec.inputs, IMAGE_EXTENSIONS)?;
        Self::page_size(spec)?;
        Ok(())
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let page_size = Self::page_size(spec)?;
        let total = spec.inputs.len();
        for (i, image) in spec.inputs.iter().enumerate() {
            checkpoint(token)?;
            progress.emit(
                "processing",
                i + 1,
                total,
                format!("adding {}", display_name(image)),
            );
        }

        checkpoint(token)?;
        let first = spec.inputs.first().ok_or(ValidationError::NoInputs)?;
        progress.emit("writing", 0, 1, "writing document");
        let dest = output_path(
            spec,
            first,
            &OutputName::new("_images")
                .base_name(spec.output_name.as_deref())
                .ext(".pdf"),
        );
        self.backend.images_to_pdf(&spec.inputs, page_size, &dest)?;
        progress.emit("writing", 1, 1, "write complete");
        Ok(JobResult::succeeded(vec![dest]))
    }
}

/// Presentation files converted one by one through an office suite.
pub struct PptToPdf {
    backend: Arc<dyn DocumentBackend>,
}

impl PptToPdf {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }
}

impl Operation for PptToPdf {
    fn tool_id(&self) -> &'static str {
        "ppt_to_pdf"
    }

    fn display_name(&self) -> &'static str {
        "PPT to PDF"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        ensure_extensions(&spec.inputs, PRESENTATION_EXTENSIONS)
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let total = spec.inputs.len();
        let mut outputs = Vec::with_capacity(total);
        for (i, source) in spec.inputs.iter().enumerate() {
            checkpoint(token)?;
            progress.emit(
                "processing",
                i,
                total,
                format!("converting {}", display_name(source)),
            );
            let dest = output_path(
                spec,
                source,
                &OutputName::new("_ppt")
                    .base_name(spec.output_name.as_deref())
                    .ext(".pdf")
                    .index(spec.name_index(i + 1)),
            );
            self.backend.convert_presentation(source, &dest)?;
            outputs.push(dest);
            progress.emit(
                "processing",
                i + 1,
                total,
                format!("converted {}", display_name(source)),
            );
        }
        Ok(JobResult::succeeded(outputs))
    }
}
