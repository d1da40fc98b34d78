//! # pdf2dark
//!
//! Convert PDF documents to dark mode.
//!
//! Each page is rasterised, its colours are inverted, and the result is
//! re-encoded as a JPEG placed on a new page. The output reads white-on-black
//! in any viewer, with no reader support needed, at the cost of selectable
//! text: every output page is a single image.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path/bytes: exists, readable, %PDF, ≤ 50 MiB
//!  ├─ 2. Render    rasterise one page via pdfium at `scale` (spawn_blocking)
//!  ├─ 3. Invert    255 - v on R, G, B; alpha untouched
//!  ├─ 4. Encode    RGBA → JPEG
//!  ├─ 5. Compose   aspect-fit and centre on an output page
//!  └─ 6. Assemble  image-only PDF (lopdf) or self-contained HTML
//! ```
//!
//! Pages go through steps 2–5 strictly one at a time. The first failure
//! aborts the whole conversion; there is never a partial artifact.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2dark::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("document.pdf", &config).await?;
//!     std::fs::write(&output.suggested_filename, &output.bytes)?;
//!     eprintln!("{} pages in {}ms",
//!         output.stats.total_pages,
//!         output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2dark` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2dark = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Rendering needs the pdfium shared library at runtime. It is looked up in
//! `PDFIUM_LIB_PATH`, then the working directory, then the system library
//! path. See [`pdfium::bind_pdfium`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pdfium;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CancellationFlag, ConversionConfig, ConversionConfigBuilder, PageSize};
pub use convert::{
    convert, convert_document, convert_from_bytes, convert_sync, convert_to_file, inspect,
    ConversionPipeline, PipelineState,
};
pub use error::{DarkPdfError, ErrorKind};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, OutputFormat, PageSummary};
pub use pipeline::assemble::{DocumentAssembler, HtmlAssembler, PdfAssembler};
pub use pipeline::compose::{PageBounds, Placement};
pub use pipeline::invert::{PixelTransform, RgbInvert};
pub use pipeline::render::{PdfiumDocument, SourceDocument};
pub use progress::{
    ConversionProgress, ConversionProgressCallback, NoopProgressCallback, Phase, ProgressCallback,
};
pub use stream::{convert_stream, ConversionEvent, ProgressStream};
