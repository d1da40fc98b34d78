//! PDF rasterisation: render one page at a time to an RGBA buffer.
//!
//! The pipeline talks to the decoder through [`SourceDocument`], which only
//! needs a page count, each page's natural size and a render call. The
//! production backend is [`PdfiumDocument`] (pdfium via `pdfium-render`);
//! tests substitute an in-memory document.
//!
//! ## Why an explicit target size?
//!
//! Raster dimensions must be exactly `round(native * scale)` on both axes so
//! that the page's aspect ratio survives into the compositor. Passing the
//! rounded size to pdfium, rather than a DPI or a scale factor, removes any
//! rounding disagreement between pdfium and the rest of the pipeline.

use crate::error::DarkPdfError;
use crate::output::DocumentMetadata;
use image::RgbaImage;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// A decoded, paged source document. Pages are 1-indexed.
pub trait SourceDocument {
    fn page_count(&self) -> usize;

    /// Natural size of a page at scale 1.0, in points.
    fn page_size(&self, page_index: usize) -> Result<(f32, f32), DarkPdfError>;

    /// Render a page into a `width` × `height` RGBA buffer.
    fn render(&self, page_index: usize, width: u32, height: u32)
        -> Result<RgbaImage, DarkPdfError>;
}

/// One rasterised page.
#[derive(Debug, Clone)]
pub struct RasterPage {
    pub pixels: RgbaImage,
    /// Scale that was applied to the page's natural size.
    pub scale: f32,
    /// Natural size in points, kept for [`crate::config::PageSize::MatchSource`].
    pub native_size: (f32, f32),
}

impl RasterPage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Pixel size of a page of `native` points rendered at `scale`.
pub fn scaled_dimensions(native: (f32, f32), scale: f32) -> (u32, u32) {
    let w = (native.0 * scale).round().max(0.0);
    let h = (native.1 * scale).round().max(0.0);
    (w as u32, h as u32)
}

/// Rasterise page `page_index` (1-based) of `document` at `scale`.
///
/// Fails with `PageDecodeFailed` before rendering if the raster would exceed
/// `max_pixels`.
pub fn rasterize(
    document: &dyn SourceDocument,
    page_index: usize,
    scale: f32,
    max_pixels: u64,
) -> Result<RasterPage, DarkPdfError> {
    let total = document.page_count();
    if page_index == 0 || page_index > total {
        return Err(DarkPdfError::PageOutOfRange {
            page: page_index,
            total,
        });
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(DarkPdfError::InvalidConfig(format!(
            "scale must be a positive number, got {scale}"
        )));
    }

    let native = document.page_size(page_index)?;
    let (width, height) = scaled_dimensions(native, scale);
    if width == 0 || height == 0 {
        return Err(DarkPdfError::PageDecodeFailed {
            page: page_index,
            detail: format!(
                "page is {}x{} pt, which renders to an empty {width}x{height} buffer",
                native.0, native.1
            ),
        });
    }

    let area = u64::from(width) * u64::from(height);
    if area > max_pixels {
        return Err(DarkPdfError::PageDecodeFailed {
            page: page_index,
            detail: format!(
                "{width}x{height} raster ({area} px) exceeds the {max_pixels} px limit; \
                 lower the scale or raise max_raster_pixels"
            ),
        });
    }

    let pixels = document.render(page_index, width, height)?;
    if pixels.dimensions() != (width, height) {
        return Err(DarkPdfError::PageDecodeFailed {
            page: page_index,
            detail: format!(
                "renderer returned {}x{}, expected {width}x{height}",
                pixels.width(),
                pixels.height()
            ),
        });
    }

    debug!("Rendered page {} → {}x{} px", page_index, width, height);

    Ok(RasterPage {
        pixels,
        scale,
        native_size: native,
    })
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// A PDF opened with pdfium.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    /// Parse `bytes` as a PDF, classifying failures as wrong/missing password
    /// or corruption.
    pub fn open(
        pdfium: &'a Pdfium,
        bytes: Vec<u8>,
        password: Option<&str>,
    ) -> Result<Self, DarkPdfError> {
        let document = pdfium
            .load_pdf_from_byte_vec(bytes, password)
            .map_err(|e| classify_open_error(e, password.is_some()))?;

        info!("PDF loaded: {} pages", document.pages().len());
        Ok(Self { document })
    }

    /// Document information dictionary plus page count and version.
    pub fn metadata(&self) -> DocumentMetadata {
        let metadata = self.document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            page_count: self.page_count(),
            pdf_version: format!("{:?}", self.document.version()),
        }
    }

    fn page(&self, page_index: usize) -> Result<PdfPage<'_>, DarkPdfError> {
        self.document
            .pages()
            .get((page_index - 1) as u16)
            .map_err(|e| DarkPdfError::PageDecodeFailed {
                page: page_index,
                detail: format!("{:?}", e),
            })
    }
}

impl SourceDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, page_index: usize) -> Result<(f32, f32), DarkPdfError> {
        let page = self.page(page_index)?;
        Ok((page.width().value, page.height().value))
    }

    fn render(
        &self,
        page_index: usize,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, DarkPdfError> {
        let page = self.page(page_index)?;
        let render_config = PdfRenderConfig::new().set_target_size(width as i32, height as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| DarkPdfError::PageDecodeFailed {
                page: page_index,
                detail: format!("{:?}", e),
            })?;

        // The bitmap (and pdfium's surface behind it) is released when this returns.
        Ok(bitmap.as_image().into_rgba8())
    }
}

fn classify_open_error(e: PdfiumError, password_given: bool) -> DarkPdfError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password_given {
            DarkPdfError::WrongPassword
        } else {
            DarkPdfError::PasswordRequired
        }
    } else {
        DarkPdfError::CorruptPdf { detail: err_str }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::Mutex;

    const LIMIT: u64 = crate::config::DEFAULT_MAX_RASTER_PIXELS;

    /// Pages of fixed natural sizes, painted a flat colour.
    struct Sheets(Vec<(f32, f32)>);

    impl SourceDocument for Sheets {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_size(&self, page_index: usize) -> Result<(f32, f32), DarkPdfError> {
            Ok(self.0[page_index - 1])
        }

        fn render(&self, _: usize, width: u32, height: u32) -> Result<RgbaImage, DarkPdfError> {
            Ok(RgbaImage::from_pixel(width, height, Rgba([10, 200, 50, 255])))
        }
    }

    /// Always renders 1×1 regardless of the requested size.
    struct Stubborn;

    impl SourceDocument for Stubborn {
        fn page_count(&self) -> usize {
            1
        }

        fn page_size(&self, _: usize) -> Result<(f32, f32), DarkPdfError> {
            Ok((100.0, 100.0))
        }

        fn render(&self, _: usize, _: u32, _: u32) -> Result<RgbaImage, DarkPdfError> {
            Ok(RgbaImage::new(1, 1))
        }
    }

    #[test]
    fn rasterize_scales_natural_size() {
        let doc = Sheets(vec![(600.0, 800.0)]);
        let page = rasterize(&doc, 1, 1.5, LIMIT).unwrap();
        assert_eq!((page.width(), page.height()), (900, 1200));
        assert_eq!(page.scale, 1.5);
        assert_eq!(page.native_size, (600.0, 800.0));
    }

    #[test]
    fn dimensions_round_to_nearest() {
        assert_eq!(scaled_dimensions((595.28, 841.89), 1.5), (893, 1263));
        assert_eq!(scaled_dimensions((612.0, 792.0), 1.0), (612, 792));
        assert_eq!(scaled_dimensions((1.4, 1.6), 1.0), (1, 2));
    }

    #[test]
    fn page_index_is_one_based() {
        let doc = Sheets(vec![(10.0, 10.0); 2]);
        assert!(matches!(
            rasterize(&doc, 0, 1.0, LIMIT),
            Err(DarkPdfError::PageOutOfRange { page: 0, total: 2 })
        ));
        assert!(matches!(
            rasterize(&doc, 3, 1.0, LIMIT),
            Err(DarkPdfError::PageOutOfRange { page: 3, total: 2 })
        ));
        assert!(rasterize(&doc, 2, 1.0, LIMIT).is_ok());
    }

    #[test]
    fn rejects_non_positive_scale() {
        let doc = Sheets(vec![(10.0, 10.0)]);
        assert!(matches!(
            rasterize(&doc, 1, 0.0, LIMIT),
            Err(DarkPdfError::InvalidConfig(_))
        ));
        assert!(matches!(
            rasterize(&doc, 1, -2.0, LIMIT),
            Err(DarkPdfError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_area_page_is_decode_error() {
        let doc = Sheets(vec![(600.0, 0.2)]);
        let err = rasterize(&doc, 1, 1.0, LIMIT).unwrap_err();
        assert!(matches!(err, DarkPdfError::PageDecodeFailed { page: 1, .. }));
    }

    #[test]
    fn size_mismatch_is_decode_error() {
        let err = rasterize(&Stubborn, 1, 1.0, LIMIT).unwrap_err();
        assert!(err.to_string().contains("expected 100x100"), "got: {err}");
    }

    /// Records requested sizes instead of allocating them.
    struct Poster {
        requests: Mutex<Vec<(u32, u32)>>,
    }

    impl SourceDocument for Poster {
        fn page_count(&self) -> usize {
            1
        }

        fn page_size(&self, _: usize) -> Result<(f32, f32), DarkPdfError> {
            // Largest page PDF allows: 200 × 200 inches.
            Ok((14_400.0, 14_400.0))
        }

        fn render(&self, _: usize, width: u32, height: u32) -> Result<RgbaImage, DarkPdfError> {
            self.requests.lock().unwrap().push((width, height));
            Ok(RgbaImage::new(1, 1))
        }
    }

    #[test]
    fn oversized_raster_fails_before_render() {
        let doc = Poster {
            requests: Mutex::new(Vec::new()),
        };
        let err = rasterize(&doc, 1, 8.0, LIMIT).unwrap_err();
        assert!(matches!(err, DarkPdfError::PageDecodeFailed { page: 1, .. }));
        assert!(err.to_string().contains("115200x115200"), "got: {err}");
        assert!(doc.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn raster_limit_is_inclusive() {
        let doc = Sheets(vec![(600.0, 800.0)]);
        let page = rasterize(&doc, 1, 1.5, 900 * 1200).unwrap();
        assert_eq!((page.width(), page.height()), (900, 1200));
        assert!(rasterize(&doc, 1, 1.5, 900 * 1200 - 1).is_err());
    }
}
