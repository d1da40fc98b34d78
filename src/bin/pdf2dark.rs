//! CLI binary for pdf2dark.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, writes the artifact and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2dark::pipeline::input::default_output_path;
use pdf2dark::{
    convert_to_file, inspect, CancellationFlag, ConversionConfig, ConversionProgress,
    ConversionProgressCallback, DarkPdfError, OutputFormat, PageSize, ProgressCallback,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a percentage bar driven by the pipeline's progress
/// bands, plus one log line per finished page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}%  {msg}  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.bar.set_prefix("Inverting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_pages} pages to dark mode…"))
        ));
    }

    fn on_progress(&self, progress: &ConversionProgress) {
        self.bar.set_position(progress.percent() as u64);
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        self.bar.set_message(format!("page {page_num}/{total_pages}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, encoded_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{:>8} bytes", encoded_len)),
        ));
    }

    fn on_conversion_failed(&self, error: &DarkPdfError) {
        self.bar.abandon_with_message(red("failed"));
        let page = error
            .page()
            .map(|p| format!(" on page {p}"))
            .unwrap_or_default();
        eprintln!("{} Conversion failed{}", red("✘"), page);
    }

    fn on_conversion_complete(&self, total_pages: usize, output_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages converted  {}",
            green("✔"),
            bold(&total_pages.to_string()),
            dim(&format!("({output_len} bytes)")),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (writes document_dark.pdf next to the input)
  pdf2dark document.pdf

  # Choose the output path
  pdf2dark document.pdf -o night.pdf

  # Single dark HTML page instead of a PDF
  pdf2dark --format html slides.pdf

  # Sharper text, smaller file
  pdf2dark --scale 2.5 --quality 0.75 paper.pdf

  # Keep each page's original size instead of A4
  pdf2dark --page-size source drawing.pdf

  # Inspect PDF metadata only
  pdf2dark --inspect-only document.pdf

  # JSON summary for scripts
  pdf2dark --json document.pdf > summary.json

PAGE SIZES:
  a4        595.28 x 841.89 pt (default)
  letter    612 x 792 pt
  source    each page keeps its own size
  WxH       custom size in points, e.g. 420x595

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium (file or directory)
  RUST_LOG          Override log filter (e.g. pdf2dark=debug)
  PDF2DARK_*        Every flag can also be set via its PDF2DARK_ variable

SETUP:
  pdfium is loaded at runtime from PDFIUM_LIB_PATH, the working directory,
  or the system library path. Pre-built libraries:
  https://github.com/bblanchon/pdfium-binaries/releases
"#;

/// Convert PDF files to dark mode.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2dark",
    version,
    about = "Convert PDF files to dark mode",
    long_about = "Convert PDF documents to dark mode by rendering every page, inverting its \
colours and rebuilding the document from the inverted images. Output is an image-only PDF \
or a single self-contained HTML page.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Output path. Default: `<stem>_dark.pdf` (or `<stem>_dark_mode.html`) beside the input.
    #[arg(short, long, env = "PDF2DARK_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format: pdf or html.
    #[arg(long, env = "PDF2DARK_FORMAT", default_value = "pdf")]
    format: OutputFormat,

    /// Rendering scale relative to the page's natural size (0.25–8).
    #[arg(long, env = "PDF2DARK_SCALE", default_value_t = 1.5)]
    scale: f32,

    /// JPEG quality (0–1).
    #[arg(long, env = "PDF2DARK_QUALITY", default_value_t = 0.9)]
    quality: f32,

    /// Output page size: a4, letter, source, or WxH in points.
    #[arg(long, env = "PDF2DARK_PAGE_SIZE", default_value = "a4")]
    page_size: PageSize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2DARK_PASSWORD")]
    password: Option<String>,

    /// Largest accepted input, in MiB.
    #[arg(long, env = "PDF2DARK_MAX_SIZE_MB", default_value_t = 50)]
    max_size_mb: u64,

    /// Largest raster a single page may render to, in megapixels.
    #[arg(long, env = "PDF2DARK_MAX_MEGAPIXELS", default_value_t = 100)]
    max_megapixels: u64,

    /// Print a JSON summary (stats and per-page placements) to stdout.
    #[arg(long, env = "PDF2DARK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2DARK_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2DARK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2DARK_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would tear the progress bar, so keep them off while
    // it is shown.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let cancel = CancellationFlag::new();
    let config = build_config(&cli, progress_cb, cancel.clone())?;

    // Ctrl-C stops the conversion before the next page.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    // ── Run conversion ───────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, cli.format));

    let stats = convert_to_file(&cli.input, &output_path, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let summary = serde_json::json!({
            "input": cli.input,
            "output": output_path,
            "format": cli.format,
            "stats": stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} pages  {}ms  →  {}",
            green("✔"),
            stats.total_pages,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} in  /  {} out",
            dim(&format!("{} bytes", stats.input_bytes)),
            dim(&format!("{} bytes", stats.output_bytes)),
        );
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: CancellationFlag,
) -> Result<ConversionConfig> {
    if !(0.25..=8.0).contains(&cli.scale) {
        anyhow::bail!("--scale must be between 0.25 and 8 (got {})", cli.scale);
    }
    if !(0.0..=1.0).contains(&cli.quality) {
        anyhow::bail!("--quality must be between 0 and 1 (got {})", cli.quality);
    }

    let mut builder = ConversionConfig::builder()
        .scale(cli.scale)
        .jpeg_quality(cli.quality)
        .page_size(cli.page_size)
        .output_format(cli.format)
        .max_file_size(cli.max_size_mb.saturating_mul(1024 * 1024))
        .max_raster_pixels(cli.max_megapixels.saturating_mul(1_000_000))
        .cancel_flag(cancel);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
