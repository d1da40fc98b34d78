//! Configuration types for PDF dark-mode conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. One struct holds every knob so a config
//! can be cloned into a blocking task, logged, or compared between runs.

use crate::error::DarkPdfError;
use crate::output::OutputFormat;
use crate::pipeline::compose::PageBounds;
use crate::pipeline::invert::{PixelTransform, RgbInvert};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default upload ceiling: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default raster ceiling: 100 megapixels (400 MB of RGBA).
pub const DEFAULT_MAX_RASTER_PIXELS: u64 = 100_000_000;

/// Configuration for a dark-mode conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2dark::{ConversionConfig, OutputFormat, PageSize};
///
/// let config = ConversionConfig::builder()
///     .scale(2.0)
///     .jpeg_quality(0.8)
///     .page_size(PageSize::Letter)
///     .output_format(OutputFormat::Html)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering scale applied to each page's natural size. Range: 0.25–8.0. Default: 1.5.
    ///
    /// At 1.0 one PDF point becomes one pixel (72 DPI). 1.5 gives 108 DPI,
    /// enough for body text to stay legible after JPEG compression while a
    /// single A4 raster stays under 5 MB of RGBA.
    pub scale: f32,

    /// JPEG quality in `[0, 1]`. Default: 0.9.
    pub jpeg_quality: f32,

    /// Physical size of each output page. Default: [`PageSize::A4`].
    pub page_size: PageSize,

    /// Output artifact format. Default: [`OutputFormat::Pdf`].
    pub output_format: OutputFormat,

    /// Largest accepted input in bytes. Default: 50 MiB.
    pub max_file_size: u64,

    /// Largest raster, in pixels, a single page may render to. Default: 100 MP.
    ///
    /// A 200 × 200 inch page at scale 8 would ask for a 115 200 px square
    /// buffer (~49 GiB). Pages over the cap fail instead of being
    /// downscaled, so raster size always stays `round(native * scale)`.
    pub max_raster_pixels: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Per-pixel colour transform. Default: [`RgbInvert`].
    pub transform: Arc<dyn PixelTransform>,

    /// Optional observer for conversion events.
    pub progress_callback: Option<ProgressCallback>,

    /// Checked between pages; raising it aborts the conversion.
    pub cancel: CancellationFlag,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            scale: 1.5,
            jpeg_quality: 0.9,
            page_size: PageSize::default(),
            output_format: OutputFormat::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_raster_pixels: DEFAULT_MAX_RASTER_PIXELS,
            password: None,
            transform: Arc::new(RgbInvert),
            progress_callback: None,
            cancel: CancellationFlag::default(),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("scale", &self.scale)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("page_size", &self.page_size)
            .field("output_format", &self.output_format)
            .field("max_file_size", &self.max_file_size)
            .field("max_raster_pixels", &self.max_raster_pixels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("transform", &self.transform.name())
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn jpeg_quality(mut self, quality: f32) -> Self {
        self.config.jpeg_quality = quality.clamp(0.0, 1.0);
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn max_raster_pixels(mut self, pixels: u64) -> Self {
        self.config.max_raster_pixels = pixels;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn transform(mut self, transform: Arc<dyn PixelTransform>) -> Self {
        self.config.transform = transform;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_flag(mut self, flag: CancellationFlag) -> Self {
        self.config.cancel = flag;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, DarkPdfError> {
        let c = &self.config;
        if !c.scale.is_finite() || c.scale <= 0.0 {
            return Err(DarkPdfError::InvalidConfig(format!(
                "scale must be a positive number, got {}",
                c.scale
            )));
        }
        if !(0.0..=1.0).contains(&c.jpeg_quality) {
            return Err(DarkPdfError::InvalidConfig(format!(
                "JPEG quality must be within 0–1, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_file_size == 0 {
            return Err(DarkPdfError::InvalidConfig(
                "max_file_size must be ≥ 1 byte".into(),
            ));
        }
        if c.max_raster_pixels == 0 {
            return Err(DarkPdfError::InvalidConfig(
                "max_raster_pixels must be ≥ 1".into(),
            ));
        }
        if let PageSize::Custom { width, height } = c.page_size {
            if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
                return Err(DarkPdfError::InvalidConfig(format!(
                    "custom page size must be positive, got {width}x{height}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Page size ────────────────────────────────────────────────────────────

/// Physical size of the pages in the output document, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// ISO A4 portrait, 595.28 × 841.89 pt. (default)
    #[default]
    A4,
    /// US Letter portrait, 612 × 792 pt.
    Letter,
    /// Arbitrary size in points.
    Custom { width: f32, height: f32 },
    /// Reuse each source page's natural size; the image fills the page exactly.
    MatchSource,
}

impl PageSize {
    /// Resolve to concrete bounds. `native` is the source page size in points.
    pub fn bounds(&self, native: (f32, f32)) -> PageBounds {
        match *self {
            PageSize::A4 => PageBounds::new(595.28, 841.89),
            PageSize::Letter => PageBounds::new(612.0, 792.0),
            PageSize::Custom { width, height } => PageBounds::new(width, height),
            PageSize::MatchSource => PageBounds::new(native.0, native.1),
        }
    }
}

impl std::str::FromStr for PageSize {
    type Err = String;

    /// Accepts `a4`, `letter`, `source`, or `<width>x<height>` in points.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "a4" => return Ok(PageSize::A4),
            "letter" => return Ok(PageSize::Letter),
            "source" | "match" | "match-source" => return Ok(PageSize::MatchSource),
            _ => {}
        }

        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("invalid page size '{s}' (expected a4, letter, source or WxH)"))?;
        let width: f32 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid page width '{}'", w.trim()))?;
        let height: f32 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid page height '{}'", h.trim()))?;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(format!("page size must be positive, got {width}x{height}"));
        }
        Ok(PageSize::Custom { width, height })
    }
}

// ── Cancellation ─────────────────────────────────────────────────────────

/// Shared flag the pipeline polls between pages.
///
/// Clones share the same underlying flag, so the caller keeps one copy and
/// hands another to the config.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect before the next page starts.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tool() {
        let c = ConversionConfig::default();
        assert_eq!(c.scale, 1.5);
        assert_eq!(c.jpeg_quality, 0.9);
        assert_eq!(c.page_size, PageSize::A4);
        assert_eq!(c.output_format, OutputFormat::Pdf);
        assert_eq!(c.max_file_size, 50 * 1024 * 1024);
        assert_eq!(c.max_raster_pixels, 100_000_000);
        assert_eq!(c.transform.name(), "rgb-invert");
    }

    #[test]
    fn builder_clamps_ranges() {
        let c = ConversionConfig::builder()
            .scale(100.0)
            .jpeg_quality(3.0)
            .build()
            .unwrap();
        assert_eq!(c.scale, 8.0);
        assert_eq!(c.jpeg_quality, 1.0);
    }

    #[test]
    fn builder_rejects_zero_raster_cap() {
        let err = ConversionConfig::builder().max_raster_pixels(0).build();
        assert!(matches!(err, Err(DarkPdfError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_nan_scale() {
        let err = ConversionConfig::builder().scale(f32::NAN).build();
        assert!(matches!(err, Err(DarkPdfError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_degenerate_custom_page() {
        let err = ConversionConfig::builder()
            .page_size(PageSize::Custom {
                width: 100.0,
                height: 0.0,
            })
            .build();
        assert!(matches!(err, Err(DarkPdfError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_zero_ceiling() {
        let err = ConversionConfig::builder().max_file_size(0).build();
        assert!(matches!(err, Err(DarkPdfError::InvalidConfig(_))));
    }

    #[test]
    fn page_size_bounds() {
        let a4 = PageSize::A4.bounds((1.0, 1.0));
        assert_eq!((a4.width, a4.height), (595.28, 841.89));
        let src = PageSize::MatchSource.bounds((600.0, 800.0));
        assert_eq!((src.width, src.height), (600.0, 800.0));
    }

    #[test]
    fn page_size_parsing() {
        assert_eq!("A4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!("letter".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert_eq!("source".parse::<PageSize>().unwrap(), PageSize::MatchSource);
        assert_eq!(
            "420x595.5".parse::<PageSize>().unwrap(),
            PageSize::Custom {
                width: 420.0,
                height: 595.5
            }
        );
        assert!("0x10".parse::<PageSize>().is_err());
        assert!("tabloid".parse::<PageSize>().is_err());
    }

    #[test]
    fn cancellation_flag_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let config = ConversionConfig::builder()
            .cancel_flag(flag.clone())
            .build()
            .unwrap();
        assert!(!config.cancel.is_cancelled());
        flag.cancel();
        assert!(config.cancel.is_cancelled());
    }

    #[test]
    fn debug_redacts_password() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let s = format!("{c:?}");
        assert!(!s.contains("hunter2"));
        assert!(s.contains("redacted"));
    }
}
