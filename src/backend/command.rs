//! [`DocumentBackend`] built on external command-line programs.
//!
//! - `qpdf` counts, assembles and rewrites PDFs
//! - `pdftoppm` rasterises pages, `pdfinfo` reports their size
//! - `img2pdf` wraps images into a PDF
//! - `tesseract` recognises text
//! - LibreOffice `soffice` converts presentations and text documents

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    BackendError, DocumentBackend, ImageFormat, OcrOptions, PageRef, PageSize, RasterOptions,
    RewriteOptions,
};

/// Program paths for the external tools. Bare names are looked up on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub qpdf: PathBuf,
    pub pdftoppm: PathBuf,
    pub pdfinfo: PathBuf,
    pub img2pdf: PathBuf,
    pub tesseract: PathBuf,
    pub soffice: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            qpdf: "qpdf".into(),
            pdftoppm: "pdftoppm".into(),
            pdfinfo: "pdfinfo".into(),
            img2pdf: "img2pdf".into(),
            tesseract: "tesseract".into(),
            soffice: "soffice".into(),
        }
    }
}

// qpdf exits with 3 when it succeeded but printed warnings.
const QPDF_WARNINGS_EXIT: i32 = 3;

#[derive(Debug, Clone, Default)]
pub struct CommandBackend {
    tools: ToolPaths,
}

impl CommandBackend {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    fn run(&self, program: &Path, args: &[OsString]) -> Result<Output, BackendError> {
        let tool = program.display().to_string();
        debug!(%tool, ?args, "running external tool");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => BackendError::MissingTool { tool: tool.clone() },
                _ => BackendError::Io(e),
            })?;

        let qpdf_warned = program == self.tools.qpdf.as_path()
            && output.status.code() == Some(QPDF_WARNINGS_EXIT);
        let accepted = output.status.success() || qpdf_warned;
        if accepted {
            Ok(output)
        } else {
            Err(classify_failure(tool, &output))
        }
    }

    /// Longer edge of page `index` in PDF points.
    fn page_long_side(&self, source: &Path, index: usize) -> Result<f64, BackendError> {
        let page = (index + 1).to_string();
        let output = self.run(
            &self.tools.pdfinfo,
            &[
                OsString::from("-f"),
                page.clone().into(),
                "-l".into(),
                page.into(),
                source.into(),
            ],
        )?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_page_size(&text)
            .map(|(width, height)| width.max(height))
            .ok_or_else(|| BackendError::UnexpectedOutput {
                tool: self.tools.pdfinfo.display().to_string(),
                output: text.trim().to_string(),
            })
    }

    /// Rasterise one page with pdftoppm to `<prefix>.<png|jpg>` and return that path.
    fn rasterize(
        &self,
        source: &Path,
        index: usize,
        options: &RasterOptions,
        prefix: &Path,
    ) -> Result<PathBuf, BackendError> {
        let long_side = match options.max_side {
            Some(_) => Some(self.page_long_side(source, index)?),
            None => None,
        };
        let args = raster_args(source, index, options, long_side, prefix);
        self.run(&self.tools.pdftoppm, &args)?;

        let produced = prefix.with_extension(options.format.extension().trim_start_matches('.'));
        if produced.exists() {
            Ok(produced)
        } else {
            Err(BackendError::UnexpectedOutput {
                tool: self.tools.pdftoppm.display().to_string(),
                output: format!("no image written for page {}", index + 1),
            })
        }
    }

    /// Convert `source` with LibreOffice into `target_ext` and copy the result to `dest`.
    fn soffice_convert(
        &self,
        source: &Path,
        target_ext: &str,
        dest: &Path,
    ) -> Result<(), BackendError> {
        let work = tempfile::Builder::new()
            .prefix("pdf-toolbox-soffice")
            .tempdir()?;
        // A private profile lets several conversions run side by side.
        let profile = work.path().join("profile");
        let outdir = work.path().join("out");
        fs::create_dir_all(&outdir)?;

        let args: Vec<OsString> = vec![
            format!("-env:UserInstallation=file://{}", profile.display()).into(),
            "--headless".into(),
            "--convert-to".into(),
            target_ext.into(),
            "--outdir".into(),
            outdir.clone().into(),
            source.into(),
        ];
        self.run(&self.tools.soffice, &args)?;

        let stem = source.file_stem().unwrap_or_default().to_string_lossy();
        let produced = outdir.join(format!("{stem}.{target_ext}"));
        if !produced.exists() {
            return Err(BackendError::UnexpectedOutput {
                tool: self.tools.soffice.display().to_string(),
                output: format!("no {target_ext} written for {}", source.display()),
            });
        }
        fs::copy(&produced, dest)?;
        Ok(())
    }
}

fn classify_failure(tool: String, output: &Output) -> BackendError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.to_ascii_lowercase().contains("password") {
        return BackendError::Encrypted { detail: stderr };
    }
    BackendError::ToolFailed {
        tool,
        status: output.status.to_string(),
        stderr,
    }
}

/// pdftoppm arguments for one page. `-scale-to` replaces `-r`, so it is only
/// passed when the page at `dpi` would exceed `max_side`.
fn raster_args(
    source: &Path,
    index: usize,
    options: &RasterOptions,
    long_side_pts: Option<f64>,
    prefix: &Path,
) -> Vec<OsString> {
    let page = (index + 1).to_string();
    let mut args: Vec<OsString> = vec![
        "-f".into(),
        page.clone().into(),
        "-l".into(),
        page.into(),
        "-r".into(),
        options.dpi.to_string().into(),
    ];
    match options.format {
        ImageFormat::Png => args.push("-png".into()),
        ImageFormat::Jpeg { quality } => {
            args.push("-jpeg".into());
            args.push("-jpegopt".into());
            args.push(format!("quality={quality}").into());
        }
    }
    if options.grayscale {
        args.push("-gray".into());
    }
    if let (Some(max_side), Some(points)) = (options.max_side, long_side_pts) {
        let pixels = f64::from(options.dpi) * points / 72.0;
        if pixels > f64::from(max_side) {
            args.push("-scale-to".into());
            args.push(max_side.to_string().into());
        }
    }
    args.push("-singlefile".into());
    args.push(source.into());
    args.push(prefix.into());
    args
}

// `Page    1 size: 595.276 x 841.89 pts (A4)` from pdfinfo.
fn parse_page_size(text: &str) -> Option<(f64, f64)> {
    text.lines().find_map(|line| {
        if !line.starts_with("Page") {
            return None;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        let at = words.iter().position(|w| *w == "size:")?;
        match words.get(at + 1..at + 4)? {
            [width, "x", height] => Some((width.parse().ok()?, height.parse().ok()?)),
            _ => None,
        }
    })
}

fn join_numbers(numbers: impl IntoIterator<Item = usize>) -> String {
    numbers
        .into_iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// qpdf arguments that build `dest` from `pages`.
fn assemble_args(pages: &[PageRef], dest: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--empty".into()];

    // Rotation page numbers refer to the output document.
    let mut by_angle: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (position, page) in pages.iter().enumerate() {
        if let Some(rotation) = page.rotation {
            by_angle
                .entry(rotation.degrees())
                .or_default()
                .push(position + 1);
        }
    }
    for (angle, positions) in by_angle {
        args.push(format!("--rotate=+{angle}:{}", join_numbers(positions)).into());
    }

    args.push("--pages".into());
    for run in pages.chunk_by(|a, b| a.source == b.source) {
        args.push(run[0].source.clone().into());
        args.push(join_numbers(run.iter().map(|p| p.index + 1)).into());
    }
    args.push("--".into());
    args.push(dest.into());
    args
}

impl DocumentBackend for CommandBackend {
    fn page_count(&self, source: &Path) -> Result<usize, BackendError> {
        let output = self.run(
            &self.tools.qpdf,
            &[OsString::from("--show-npages"), source.into()],
        )?;
        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse()
            .map_err(|_| BackendError::UnexpectedOutput {
                tool: self.tools.qpdf.display().to_string(),
                output: text.trim().to_string(),
            })
    }

    fn assemble(&self, pages: &[PageRef], dest: &Path) -> Result<(), BackendError> {
        if pages.is_empty() {
            return Err(BackendError::EmptyDocument);
        }
        self.run(&self.tools.qpdf, &assemble_args(pages, dest))?;
        Ok(())
    }

    fn rewrite(
        &self,
        source: &Path,
        dest: &Path,
        options: &RewriteOptions,
    ) -> Result<(), BackendError> {
        let mut args: Vec<OsString> = Vec::new();
        if options.linearize {
            args.push("--linearize".into());
        }
        if options.recompress_streams {
            args.push("--recompress-flate".into());
            args.push("--compression-level=9".into());
            args.push("--object-streams=generate".into());
        }
        args.push(source.into());
        args.push(dest.into());
        self.run(&self.tools.qpdf, &args)?;
        Ok(())
    }

    fn render_page(
        &self,
        source: &Path,
        index: usize,
        options: &RasterOptions,
        dest: &Path,
    ) -> Result<(), BackendError> {
        // Render next to the destination so the final rename stays on one filesystem.
        let parent = dest.parent().unwrap_or(Path::new("."));
        let work = tempfile::Builder::new()
            .prefix(".pdf-toolbox-render")
            .tempdir_in(parent)?;
        let produced = self.rasterize(source, index, options, &work.path().join("page"))?;
        fs::rename(produced, dest)?;
        Ok(())
    }

    fn images_to_pdf(
        &self,
        images: &[PathBuf],
        page_size: PageSize,
        dest: &Path,
    ) -> Result<(), BackendError> {
        if images.is_empty() {
            return Err(BackendError::EmptyDocument);
        }
        let mut args: Vec<OsString> = Vec::new();
        let size = match page_size {
            PageSize::A4 => Some("A4"),
            PageSize::Letter => Some("Letter"),
            PageSize::Fit => None,
        };
        if let Some(size) = size {
            args.push("--pagesize".into());
            args.push(size.into());
        }
        args.push("-o".into());
        args.push(dest.into());
        args.extend(images.iter().map(|p| p.clone().into_os_string()));
        self.run(&self.tools.img2pdf, &args)?;
        Ok(())
    }

    fn convert_presentation(&self, source: &Path, dest: &Path) -> Result<(), BackendError> {
        self.soffice_convert(source, "pdf", dest)
    }

    fn ocr_page(
        &self,
        source: &Path,
        index: usize,
        options: &OcrOptions,
        pdf_dest: Option<&Path>,
    ) -> Result<String, BackendError> {
        let work = tempfile::Builder::new()
            .prefix("pdf-toolbox-ocr")
            .tempdir()?;
        let raster = RasterOptions {
            dpi: options.dpi,
            format: ImageFormat::Png,
            grayscale: false,
            max_side: None,
        };
        let image = self.rasterize(source, index, &raster, &work.path().join("page"))?;

        let base = work.path().join("ocr");
        let mut args: Vec<OsString> = vec![
            image.into(),
            base.clone().into(),
            "-l".into(),
            options.lang.clone().into(),
        ];
        if pdf_dest.is_some() {
            args.push("pdf".into());
        }
        args.push("txt".into());
        self.run(&self.tools.tesseract, &args)?;

        if let Some(pdf_dest) = pdf_dest {
            fs::copy(base.with_extension("pdf"), pdf_dest)?;
        }
        Ok(fs::read_to_string(base.with_extension("txt"))?)
    }

    fn write_text_document(&self, pages: &[String], dest: &Path) -> Result<(), BackendError> {
        let work = tempfile::Builder::new()
            .prefix("pdf-toolbox-text")
            .tempdir()?;
        let text_path = work.path().join("document.txt");
        // Form feed marks a page break for the text import filter.
        fs::write(&text_path, pages.join("\n\u{c}"))?;
        self.soffice_convert(&text_path, "docx", dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Rotation;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn assemble_groups_consecutive_pages_by_source() {
        let pages = vec![
            PageRef::new("a.pdf", 0),
            PageRef::new("a.pdf", 2),
            PageRef::new("b.pdf", 0),
            PageRef::new("a.pdf", 1),
        ];
        let args = strings(&assemble_args(&pages, Path::new("out.pdf")));
        assert_eq!(
            args,
            vec![
                "--empty", "--pages", "a.pdf", "1,3", "b.pdf", "1", "a.pdf", "2", "--", "out.pdf"
            ]
        );
    }

    #[test]
    fn assemble_rotations_use_output_positions() {
        let pages = vec![
            PageRef::new("a.pdf", 4).rotated(Rotation::from_degrees(90)),
            PageRef::new("a.pdf", 5),
            PageRef::new("a.pdf", 6).rotated(Rotation::from_degrees(90)),
            PageRef::new("a.pdf", 7).rotated(Rotation::from_degrees(180)),
        ];
        let args = strings(&assemble_args(&pages, Path::new("out.pdf")));
        assert_eq!(&args[1..3], &["--rotate=+90:1,3", "--rotate=+180:4"]);
        assert_eq!(&args[3..6], &["--pages", "a.pdf", "5,6,7,8"]);
    }

    fn jpeg_options(dpi: u32, max_side: Option<u32>) -> RasterOptions {
        RasterOptions {
            dpi,
            format: ImageFormat::Jpeg { quality: 75 },
            grayscale: false,
            max_side,
        }
    }

    #[test]
    fn raster_keeps_dpi_when_page_fits_under_max_side() {
        // A4 at 72 dpi is 842 px on the long edge.
        let options = jpeg_options(72, Some(1600));
        let args = strings(&raster_args(
            Path::new("a.pdf"),
            0,
            &options,
            Some(841.89),
            Path::new("page"),
        ));
        assert_eq!(
            args,
            vec![
                "-f", "1", "-l", "1", "-r", "72", "-jpeg", "-jpegopt", "quality=75",
                "-singlefile", "a.pdf", "page"
            ]
        );
    }

    #[test]
    fn raster_scales_down_when_page_exceeds_max_side() {
        // A4 at 300 dpi is 3508 px on the long edge.
        let options = jpeg_options(300, Some(1600));
        let args = strings(&raster_args(
            Path::new("a.pdf"),
            2,
            &options,
            Some(841.89),
            Path::new("page"),
        ));
        assert_eq!(&args[0..6], &["-f", "3", "-l", "3", "-r", "300"]);
        assert_eq!(&args[9..11], &["-scale-to", "1600"]);
    }

    #[test]
    fn raster_without_cap_never_scales() {
        let options = jpeg_options(600, None);
        let args = strings(&raster_args(
            Path::new("a.pdf"),
            0,
            &options,
            None,
            Path::new("page"),
        ));
        assert!(!args.iter().any(|a| a == "-scale-to"));
    }

    #[test]
    fn page_size_parsed_from_pdfinfo_output() {
        let text = "Producer:       qpdf\nPages:          3\n\
                    Page    2 size: 595.276 x 841.89 pts (A4)\n\
                    Page    2 rot:  0\n";
        assert_eq!(parse_page_size(text), Some((595.276, 841.89)));
        assert_eq!(
            parse_page_size("Page size:      612 x 792 pts (letter)\n"),
            Some((612.0, 792.0))
        );
        assert_eq!(parse_page_size("Pages: 3\n"), None);
    }

    #[test]
    fn missing_program_is_reported_as_missing_tool() {
        let backend = CommandBackend::new(ToolPaths {
            qpdf: "/nonexistent/pdf-toolbox/qpdf".into(),
            ..Default::default()
        });
        let err = backend.page_count(Path::new("in.pdf")).unwrap_err();
        assert!(matches!(err, BackendError::MissingTool { .. }), "{err}");
    }

    #[test]
    fn empty_assembly_is_rejected_before_running() {
        let backend = CommandBackend::default();
        let err = backend.assemble(&[], Path::new("out.pdf")).unwrap_err();
        assert!(matches!(err, BackendError::EmptyDocument));
    }

    #[test]
    fn tool_paths_deserialize_partially() {
        let tools: ToolPaths = toml::from_str(r#"tesseract = "/opt/tess/bin/tesseract""#).unwrap();
        assert_eq!(tools.tesseract, PathBuf::from("/opt/tess/bin/tesseract"));
        assert_eq!(tools.qpdf, PathBuf::from("qpdf"));
    }
}
