//! Conversion entry points and the page-by-page pipeline that drives them.
//!
//! [`ConversionPipeline`] is a small state machine:
//!
//! ```text
//! Idle ─▶ Initializing ─▶ PerPage(1) ─▶ … ─▶ PerPage(N) ─▶ Finalizing ─▶ Done
//!   └──────────────┴──────────────┴─────────────┴──────────────┴─▶ Failed(kind)
//! ```
//!
//! Exactly one page is in flight at a time. Its raster is dropped as soon as
//! the JPEG exists, so peak memory is one RGBA page plus the growing output
//! document. The first error of any kind ends the run in `Failed`; no
//! partial artifact is returned and nothing is retried.
//!
//! The async functions ([`convert`], [`convert_from_bytes`],
//! [`convert_to_file`], [`inspect`]) run the pipeline inside
//! `spawn_blocking` because pdfium is synchronous and not async-safe.
//! [`convert_document`] is the synchronous core for callers that already have
//! a [`SourceDocument`].

use crate::config::ConversionConfig;
use crate::error::{DarkPdfError, ErrorKind};
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata, OutputFormat, PageSummary};
use crate::pdfium::bind_pdfium;
use crate::pipeline::assemble::{DocumentAssembler, HtmlAssembler, PdfAssembler};
use crate::pipeline::render::{PdfiumDocument, SourceDocument};
use crate::pipeline::{compose, encode, input, render};
use crate::progress::{ConversionProgress, Phase};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a [`ConversionPipeline`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Initializing,
    /// Processing the given 1-based page.
    PerPage(usize),
    Finalizing,
    Done,
    Failed(ErrorKind),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

/// What a successful [`ConversionPipeline::run`] produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub bytes: Vec<u8>,
    pub pages: Vec<PageSummary>,
    pub encoded_image_bytes: usize,
    pub render_duration_ms: u64,
    pub compose_duration_ms: u64,
}

/// Drives one conversion, page by page, reporting progress as it goes.
///
/// A pipeline runs once. Create a new one per document.
pub struct ConversionPipeline<'c> {
    config: &'c ConversionConfig,
    state: PipelineState,
    last_fraction: f64,
    reading_reported: bool,
}

impl<'c> ConversionPipeline<'c> {
    pub fn new(config: &'c ConversionConfig) -> Self {
        Self {
            config,
            state: PipelineState::Idle,
            last_fraction: 0.0,
            reading_reported: false,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// `Idle → Initializing`, reporting 0 %.
    pub fn start(&mut self) {
        if self.state == PipelineState::Idle {
            self.state = PipelineState::Initializing;
            self.emit(ConversionProgress::new(Phase::Initializing, 0, 0));
        }
    }

    /// Source bytes are in memory and the document is being opened (10 %).
    pub fn mark_reading(&mut self) {
        self.start();
        if !self.reading_reported && self.state == PipelineState::Initializing {
            self.reading_reported = true;
            self.emit(ConversionProgress::new(Phase::Reading, 0, 0));
        }
    }

    /// Move to `Failed`, report the error once, and hand it back for `?`.
    pub fn fail(&mut self, error: DarkPdfError) -> DarkPdfError {
        if !self.state.is_terminal() {
            warn!("Conversion failed ({:?}): {}", error.kind(), error);
            self.state = PipelineState::Failed(error.kind());
            if let Some(ref cb) = self.config.progress_callback {
                cb.on_conversion_failed(&error);
                cb.on_progress(&ConversionProgress::new(Phase::Initializing, 0, 0));
            }
        }
        error
    }

    /// Convert every page of `document` into `output` and serialise it.
    pub fn run(
        &mut self,
        document: &dyn SourceDocument,
        output: Box<dyn DocumentAssembler>,
    ) -> Result<PipelineOutput, DarkPdfError> {
        if !matches!(self.state, PipelineState::Idle | PipelineState::Initializing) {
            return Err(DarkPdfError::Internal(format!(
                "pipeline already used (state {:?})",
                self.state
            )));
        }
        self.mark_reading();

        match self.run_pages(document, output) {
            Ok(out) => Ok(out),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn run_pages(
        &mut self,
        document: &dyn SourceDocument,
        mut output: Box<dyn DocumentAssembler>,
    ) -> Result<PipelineOutput, DarkPdfError> {
        let config = self.config;
        let total = document.page_count();
        info!(
            "Converting {} pages (scale {}, transform {})",
            total,
            config.scale,
            config.transform.name()
        );

        if let Some(ref cb) = config.progress_callback {
            cb.on_conversion_start(total);
        }
        self.emit(ConversionProgress::new(Phase::Rendering, 0, total));

        let mut pages = Vec::with_capacity(total);
        let mut encoded_image_bytes = 0usize;
        let mut render_ms = 0u64;
        let mut compose_ms = 0u64;

        for page_num in 1..=total {
            if config.cancel.is_cancelled() {
                info!("Cancellation requested before page {}", page_num);
                return Err(DarkPdfError::Cancelled {
                    pages_completed: page_num - 1,
                    pages_total: total,
                });
            }

            self.state = PipelineState::PerPage(page_num);
            if let Some(ref cb) = config.progress_callback {
                cb.on_page_start(page_num, total);
            }

            let render_start = Instant::now();
            let raster =
                render::rasterize(document, page_num, config.scale, config.max_raster_pixels)?;
            render_ms += render_start.elapsed().as_millis() as u64;

            let compose_start = Instant::now();
            let native_size = raster.native_size;
            let mut pixels = raster.pixels;
            let (raster_width, raster_height) = pixels.dimensions();

            config.transform.apply(&mut pixels);
            let encoded = encode::encode_page(pixels, config.jpeg_quality, page_num)?;

            let bounds = config.page_size.bounds(native_size);
            let placement = compose::place(output.as_mut(), &encoded, bounds, page_num)?;
            compose_ms += compose_start.elapsed().as_millis() as u64;

            let encoded_len = encoded.data.len();
            encoded_image_bytes += encoded_len;
            debug!(
                "Page {}/{} placed at ({:.1}, {:.1}) {:.1}x{:.1} pt",
                page_num, total, placement.x, placement.y, placement.width, placement.height
            );

            pages.push(PageSummary {
                page_num,
                raster_width,
                raster_height,
                encoded_bytes: encoded_len,
                bounds,
                placement,
            });

            if let Some(ref cb) = config.progress_callback {
                cb.on_page_complete(page_num, total, encoded_len);
            }
            // The last page only counts once the output is serialised, so
            // `pages_completed == pages_total` is first observed at Done.
            if page_num < total {
                self.emit(ConversionProgress::new(Phase::Rendering, page_num, total));
            }
        }

        self.state = PipelineState::Finalizing;
        self.emit(ConversionProgress::new(
            Phase::Finalizing,
            total.saturating_sub(1),
            total,
        ));

        if output.page_count() != total {
            return Err(DarkPdfError::Internal(format!(
                "assembled {} pages from a {}-page source",
                output.page_count(),
                total
            )));
        }
        let bytes = output.finish()?;

        self.state = PipelineState::Done;
        self.emit(ConversionProgress::new(Phase::Done, total, total));
        if let Some(ref cb) = config.progress_callback {
            cb.on_conversion_complete(total, bytes.len());
        }

        Ok(PipelineOutput {
            bytes,
            pages,
            encoded_image_bytes,
            render_duration_ms: render_ms,
            compose_duration_ms: compose_ms,
        })
    }

    fn emit(&mut self, progress: ConversionProgress) {
        let fraction = progress.fraction();
        debug_assert!(
            fraction >= self.last_fraction,
            "progress went backwards: {} -> {}",
            self.last_fraction,
            fraction
        );
        self.last_fraction = fraction;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_progress(&progress);
        }
    }
}

/// Build the assembler for `format`. `title` labels the HTML page.
pub fn new_assembler(format: OutputFormat, title: &str) -> Box<dyn DocumentAssembler> {
    match format {
        OutputFormat::Pdf => Box::new(PdfAssembler::new()),
        OutputFormat::Html => Box::new(HtmlAssembler::new(title)),
    }
}

// ── Synchronous core ─────────────────────────────────────────────────────

/// Convert an already-open document. Blocks the calling thread.
///
/// `file_stem` names the output (`<stem>_dark.pdf`) and titles HTML output.
pub fn convert_document(
    document: &dyn SourceDocument,
    config: &ConversionConfig,
    file_stem: &str,
) -> Result<ConversionOutput, DarkPdfError> {
    let started = Instant::now();
    let mut pipeline = ConversionPipeline::new(config);
    pipeline.start();
    run_to_output(&mut pipeline, document, config, file_stem, None, 0, started)
}

fn run_to_output(
    pipeline: &mut ConversionPipeline<'_>,
    document: &dyn SourceDocument,
    config: &ConversionConfig,
    file_stem: &str,
    metadata: Option<DocumentMetadata>,
    input_bytes: usize,
    started: Instant,
) -> Result<ConversionOutput, DarkPdfError> {
    let format = config.output_format;
    let out = pipeline.run(document, new_assembler(format, file_stem))?;

    let stats = ConversionStats {
        total_pages: out.pages.len(),
        input_bytes,
        output_bytes: out.bytes.len(),
        encoded_image_bytes: out.encoded_image_bytes,
        render_duration_ms: out.render_duration_ms,
        compose_duration_ms: out.compose_duration_ms,
        total_duration_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages, {} bytes of {}, {}ms",
        stats.total_pages, stats.output_bytes, format, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        bytes: out.bytes,
        format,
        suggested_filename: input::filename_for_stem(file_stem, format),
        pages: out.pages,
        metadata,
        stats,
    })
}

/// Open `bytes` with pdfium and run the pipeline. Bytes are already validated.
fn convert_loaded_blocking(
    bytes: Vec<u8>,
    config: &ConversionConfig,
    file_stem: &str,
    started: Instant,
) -> Result<ConversionOutput, DarkPdfError> {
    let mut pipeline = ConversionPipeline::new(config);
    pipeline.mark_reading();

    let input_bytes = bytes.len();
    let pdfium = bind_pdfium().map_err(|e| pipeline.fail(e))?;
    let document = PdfiumDocument::open(&pdfium, bytes, config.password.as_deref())
        .map_err(|e| pipeline.fail(e))?;
    let metadata = document.metadata();

    run_to_output(
        &mut pipeline,
        &document,
        config,
        file_stem,
        Some(metadata),
        input_bytes,
        started,
    )
}

fn convert_path_blocking(
    path: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DarkPdfError> {
    let started = Instant::now();
    info!("Starting conversion: {}", path.display());

    let bytes = input::read_local(path, config.max_file_size)
        .map_err(|e| report_validation_failure(config, e))?;
    convert_loaded_blocking(bytes, config, &input::file_stem(path), started)
}

/// Validation runs before the pipeline exists; report it the same way.
fn report_validation_failure(config: &ConversionConfig, error: DarkPdfError) -> DarkPdfError {
    ConversionPipeline::new(config).fail(error)
}

// ── Async API ────────────────────────────────────────────────────────────

/// Convert a local PDF file to a dark-mode artifact.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Any failure is fatal and yields no artifact: validation (missing file,
/// not a PDF, too large), opening (corrupt, password), any page failing to
/// render, encode or place, serialisation, or cancellation.
pub async fn convert(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DarkPdfError> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || convert_path_blocking(&path, &config))
        .await
        .map_err(|e| DarkPdfError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Convert PDF bytes already in memory.
///
/// The output is named after `"document"`; use [`convert_document`] with a
/// [`PdfiumDocument`] to choose another stem.
///
/// # Example
/// ```rust,no_run
/// use pdf2dark::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("document.pdf")?;
/// let output = convert_from_bytes(&bytes, &ConversionConfig::default()).await?;
/// std::fs::write(&output.suggested_filename, &output.bytes)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, DarkPdfError> {
    input::validate_bytes(bytes, "<memory>", config.max_file_size)
        .map_err(|e| report_validation_failure(config, e))?;

    let bytes = bytes.to_vec();
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        convert_loaded_blocking(bytes, &config, "document", Instant::now())
    })
    .await
    .map_err(|e| DarkPdfError::Internal(format!("Conversion task panicked: {}", e)))?
}

/// Convert a PDF and write the artifact to `output_path`.
///
/// Uses atomic write (temp file + rename), so a failed run never leaves a
/// partial file behind.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, DarkPdfError> {
    let output = convert(input_path, config).await?;
    let path = output_path.as_ref().to_path_buf();
    let bytes = output.bytes;

    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
        .await
        .map_err(|e| DarkPdfError::Internal(format!("Write task panicked: {}", e)))??;

    Ok(output.stats)
}

/// Write `bytes` to `path` through a temp file in the same directory,
/// renamed into place once complete.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DarkPdfError> {
    let write_err = |e| DarkPdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(write_err)?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    // Dropped (and deleted) on any early return.
    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DarkPdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DarkPdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(path, config))
}

/// Read document metadata without converting any page.
pub async fn inspect(
    path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentMetadata, DarkPdfError> {
    let path = path.as_ref().to_path_buf();
    let password = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || {
        let bytes = input::read_local(&path, u64::MAX)?;
        let pdfium = bind_pdfium()?;
        let document = PdfiumDocument::open(&pdfium, bytes, password.as_deref())?;
        Ok(document.metadata())
    })
    .await
    .map_err(|e| DarkPdfError::Internal(format!("Metadata task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CancellationFlag;
    use crate::progress::ConversionProgressCallback;
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    struct Blank {
        pages: usize,
        broken: Option<usize>,
    }

    impl SourceDocument for Blank {
        fn page_count(&self) -> usize {
            self.pages
        }

        fn page_size(&self, _: usize) -> Result<(f32, f32), DarkPdfError> {
            Ok((60.0, 80.0))
        }

        fn render(&self, page: usize, w: u32, h: u32) -> Result<RgbaImage, DarkPdfError> {
            if self.broken == Some(page) {
                return Err(DarkPdfError::PageDecodeFailed {
                    page,
                    detail: "bad content stream".into(),
                });
            }
            Ok(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])))
        }
    }

    #[derive(Default)]
    struct Recorder {
        failures: Mutex<Vec<ErrorKind>>,
        percents: Mutex<Vec<u8>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_progress(&self, p: &ConversionProgress) {
            self.percents.lock().unwrap().push(p.percent());
        }

        fn on_conversion_failed(&self, error: &DarkPdfError) {
            self.failures.lock().unwrap().push(error.kind());
        }
    }

    #[test]
    fn state_reaches_done() {
        let config = ConversionConfig::default();
        let mut pipeline = ConversionPipeline::new(&config);
        assert_eq!(pipeline.state(), PipelineState::Idle);

        let doc = Blank { pages: 2, broken: None };
        let out = pipeline
            .run(&doc, new_assembler(OutputFormat::Pdf, "t"))
            .unwrap();
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(out.pages.len(), 2);
        assert!(out.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn pipeline_runs_once() {
        let config = ConversionConfig::default();
        let mut pipeline = ConversionPipeline::new(&config);
        let doc = Blank { pages: 1, broken: None };
        pipeline.run(&doc, new_assembler(OutputFormat::Pdf, "t")).unwrap();
        let err = pipeline
            .run(&doc, new_assembler(OutputFormat::Pdf, "t"))
            .unwrap_err();
        assert!(matches!(err, DarkPdfError::Internal(_)));
        assert_eq!(pipeline.state(), PipelineState::Done);
    }

    #[test]
    fn failure_sets_state_and_reports_once() {
        let recorder = Arc::new(Recorder::default());
        let config = ConversionConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        let mut pipeline = ConversionPipeline::new(&config);
        let doc = Blank { pages: 3, broken: Some(2) };

        let err = pipeline
            .run(&doc, new_assembler(OutputFormat::Pdf, "t"))
            .unwrap_err();
        assert_eq!(err.page(), Some(2));
        assert_eq!(
            pipeline.state(),
            PipelineState::Failed(ErrorKind::PageDecode)
        );
        assert_eq!(*recorder.failures.lock().unwrap(), vec![ErrorKind::PageDecode]);
        // Progress resets on failure.
        assert_eq!(recorder.percents.lock().unwrap().last(), Some(&0));
    }

    #[test]
    fn cancellation_checked_before_each_page() {
        let flag = CancellationFlag::new();
        flag.cancel();
        let config = ConversionConfig::builder().cancel_flag(flag).build().unwrap();
        let err = convert_document(&Blank { pages: 4, broken: None }, &config, "x").unwrap_err();
        match err {
            DarkPdfError::Cancelled {
                pages_completed,
                pages_total,
            } => {
                assert_eq!(pages_completed, 0);
                assert_eq!(pages_total, 4);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn output_named_after_stem() {
        let config = ConversionConfig::builder()
            .output_format(OutputFormat::Html)
            .build()
            .unwrap();
        let out = convert_document(&Blank { pages: 1, broken: None }, &config, "slides").unwrap();
        assert_eq!(out.suggested_filename, "slides_dark_mode.html");
        assert_eq!(out.format, OutputFormat::Html);
        assert_eq!(out.stats.total_pages, 1);
        assert!(out.metadata.is_none());
    }

    #[test]
    fn write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/deeper/out.pdf");
        write_atomic(&target, b"%PDF-1.5").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.5");
        // Only the final file remains.
        let entries = std::fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.pdf");
        std::fs::write(&target, b"old").unwrap();
        write_atomic(&target, b"new").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[tokio::test]
    async fn convert_rejects_missing_file() {
        let err = convert("/nonexistent/file.pdf", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn convert_from_bytes_rejects_non_pdf() {
        let err = convert_from_bytes(b"GIF89a", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DarkPdfError::NotAPdf { .. }));
    }
}
