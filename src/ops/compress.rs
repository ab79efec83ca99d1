use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{Operation, ProgressEmitter, checkpoint, display_name, output_path, validate_io};
use crate::backend::{DocumentBackend, ImageFormat, PageSize, RasterOptions, RewriteOptions};
use crate::cancel::CancellationToken;
use crate::error::{OperationError, ValidationError};
use crate::job::{JobResult, JobSpec};
use crate::naming::OutputName;

/// Structural re-save: object streams, recompressed streams, optional linearisation.
pub struct CompressBasic {
    backend: Arc<dyn DocumentBackend>,
}

impl CompressBasic {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    fn options(spec: &JobSpec) -> Result<RewriteOptions, ValidationError> {
        Ok(RewriteOptions {
            linearize: spec.params.bool_or("linearize", false)?,
            recompress_streams: spec.params.bool_or("recompress_streams", true)?,
        })
    }
}

impl Operation for CompressBasic {
    fn tool_id(&self) -> &'static str {
        "compress_basic"
    }

    fn display_name(&self) -> &'static str {
        "Basic Compression"
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
        let options = Self::options(spec)?;
        let total = spec.inputs.len();
        let mut outputs = Vec::with_capacity(total);
        let mut not_smaller = Vec::new();

        for (i, source) in spec.inputs.iter().enumerate() {
            checkpoint(token)?;
            let dest = output_path(
                spec,
                source,
                &OutputName::new("_compressed")
                    .base_name(spec.output_name.as_deref())
                    .ext(".pdf")
                    .index(spec.name_index(i + 1)),
            );
            self.backend.rewrite(source, &dest, &options)?;

            let before = fs::metadata(source)?.len();
            let after = fs::metadata(&dest)?.len();
            debug!(input = %source.display(), before, after, "rewrote document");
            if after >= before {
                not_smaller.push(display_name(source));
            }

            outputs.push(dest);
            progress.emit(
                "processing",
                i + 1,
                total,
                format!("compressed {}", display_name(source)),
            );
        }

        let result = JobResult::succeeded(outputs);
        if not_smaller.is_empty() {
            return Ok(result);
        }
        warn!(files = ?not_smaller, "compression did not reduce size");
        Ok(result.with_warning(format!(
            "no size reduction for: {}",
            not_smaller.join(", ")
        )))
    }
}

/// Rasterise every page to JPEG and wrap the images back into a PDF.
/// Text stops being selectable; scanned documents shrink a lot.
pub struct CompressImages {
    backend: Arc<dyn DocumentBackend>,
}

impl CompressImages {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    fn options(spec: &JobSpec) -> Result<RasterOptions, ValidationError> {
        let dpi = spec.params.u32_in("dpi", 150, 72..=600)?;
        let quality = spec.params.u32_in("jpeg_quality", 75, 30..=95)?;
        let max_side = spec.params.u32_or("max_side", 1600)?;
        if max_side != 0 && !(500..=5000).contains(&max_side) {
            return Err(ValidationError::invalid_param(
                "max_side",
                format!("{max_side} is outside 500..=5000 (0 for no limit)"),
            ));
        }
        Ok(RasterOptions {
            dpi,
            format: ImageFormat::Jpeg {
                quality: quality as u8,
            },
            grayscale: spec.params.bool_or("grayscale", false)?,
            max_side: (max_side != 0).then_some(max_side),
        })
    }
}

impl Operation for CompressImages {
    fn tool_id(&self) -> &'static str {
        "compress_images"
    }

    fn display_name(&self) -> &'static str {
        "Image Re-encode Compression"
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
        let options = Self::options(spec)?;

        let mut counts = Vec::with_capacity(spec.inputs.len());
        for source in &spec.inputs {
            checkpoint(token)?;
            counts.push(self.backend.page_count(source)?);
        }
        let total: usize = counts.iter().sum();
        let mut current = 0;
        let mut outputs = Vec::with_capacity(spec.inputs.len());

        for (i, (source, &count)) in spec.inputs.iter().zip(&counts).enumerate() {
            let scratch = tempfile::Builder::new()
                .prefix("pdf-toolbox-imgcompress")
                .tempdir()?;
            let mut images: Vec<PathBuf> = Vec::with_capacity(count);
            for index in 0..count {
                checkpoint(token)?;
                let image = scratch.path().join(format!("page_{index:05}.jpg"));
                self.backend.render_page(source, index, &options, &image)?;
                images.push(image);
                current += 1;
                progress.emit(
                    "processing",
                    current,
                    total,
                    format!("{} page {}", display_name(source), index + 1),
                );
            }

            checkpoint(token)?;
            let dest = output_path(
                spec,
                source,
                &OutputName::new("_imgcompressed")
                    .base_name(spec.output_name.as_deref())
                    .ext(".pdf")
                    .index(spec.name_index(i + 1)),
            );
            self.backend.images_to_pdf(&images, PageSize::Fit, &dest)?;
            outputs.push(dest);
        }

        Ok(JobResult::succeeded(outputs))
    }
}
