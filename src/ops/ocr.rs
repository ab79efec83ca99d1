use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::{Operation, ProgressEmitter, checkpoint, display_name, output_path, validate_io};
use crate::backend::{DocumentBackend, OcrOptions, PageRef};
use crate::cancel::CancellationToken;
use crate::error::{OperationError, ValidationError};
use crate::job::{JobResult, JobSpec};
use crate::naming::OutputName;

pub const DEFAULT_OCR_LANG: &str = "chi_sim+eng";

/// Text recognition into a searchable PDF, an editable document, or both.
pub struct Ocr {
    backend: Arc<dyn DocumentBackend>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OcrPlan {
    options: OcrOptions,
    output_pdf: bool,
    output_docx: bool,
}

impl Ocr {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self { backend }
    }

    fn plan(spec: &JobSpec) -> Result<OcrPlan, ValidationError> {
        let dpi = spec.params.u32_in("dpi", 300, 100..=600)?;
        let lang = spec.params.str_or("lang", DEFAULT_OCR_LANG)?;
        let lang = lang.trim();
        let well_formed = !lang.is_empty()
            && lang.split('+').all(|part| {
                !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            });
        if !well_formed {
            return Err(ValidationError::invalid_param(
                "lang",
                format!("expected language codes joined by '+', got {lang:?}"),
            ));
        }

        let output_pdf = spec.params.bool_or("output_pdf", false)?;
        let output_docx = spec.params.bool_or("output_docx", false)?;
        if !output_pdf && !output_docx {
            return Err(ValidationError::NoOcrOutput);
        }
        Ok(OcrPlan {
            options: OcrOptions {
                dpi,
                lang: lang.to_string(),
            },
            output_pdf,
            output_docx,
        })
    }
}

impl Operation for Ocr {
    fn tool_id(&self) -> &'static str {
        "ocr"
    }

    fn display_name(&self) -> &'static str {
        "OCR"
    }

    fn validate(&self, spec: &JobSpec) -> Result<(), ValidationError> {
        validate_io(spec)?;
        Self::plan(spec)?;
        Ok(())
    }

    fn run(
        &self,
        spec: &JobSpec,
        progress: &ProgressEmitter,
        token: &CancellationToken,
    ) -> Result<JobResult, OperationError> {
        let plan = Self::plan(spec)?;

        let mut counts = Vec::with_capacity(spec.inputs.len());
        for source in &spec.inputs {
            checkpoint(token)?;
            counts.push(self.backend.page_count(source)?);
        }
        let total: usize = counts.iter().sum();
        let mut current = 0;
        let mut outputs = Vec::new();

        for (i, (source, &count)) in spec.inputs.iter().zip(&counts).enumerate() {
            let scratch = tempfile::Builder::new()
                .prefix("pdf-toolbox-ocr")
                .tempdir()?;
            let mut page_pdfs: Vec<PathBuf> = Vec::with_capacity(count);
            let mut texts = Vec::with_capacity(count);

            for index in 0..count {
                checkpoint(token)?;
                let page_pdf = plan
                    .output_pdf
                    .then(|| scratch.path().join(format!("page_{index:05}.pdf")));
                let text =
                    self.backend
                        .ocr_page(source, index, &plan.options, page_pdf.as_deref())?;
                texts.push(text.trim().to_string());
                page_pdfs.extend(page_pdf);
                current += 1;
                progress.emit(
                    "processing",
                    current,
                    total,
                    format!("{} page {}", display_name(source), index + 1),
                );
            }

            let name_index = spec.name_index(i + 1);
            if plan.output_pdf {
                checkpoint(token)?;
                let pages: Vec<PageRef> = page_pdfs.iter().map(|p| PageRef::new(p, 0)).collect();
                let dest = output_path(
                    spec,
                    source,
                    &OutputName::new("_ocr")
                        .base_name(spec.output_name.as_deref())
                        .ext(".pdf")
                        .index(name_index),
                );
                self.backend.assemble(&pages, &dest)?;
                debug!(output = %dest.display(), "wrote searchable pdf");
                outputs.push(dest);
            }
            if plan.output_docx {
                checkpoint(token)?;
                let dest = output_path(
                    spec,
                    source,
                    &OutputName::new("_ocr")
                        .base_name(spec.output_name.as_deref())
                        .ext(".docx")
                        .index(name_index),
                );
                self.backend.write_text_document(&texts, &dest)?;
                debug!(output = %dest.display(), "wrote text document");
                outputs.push(dest);
            }
        }

        Ok(JobResult::succeeded(outputs))
    }
}
