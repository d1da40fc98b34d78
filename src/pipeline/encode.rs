//! Image encoding: inverted `RgbaImage` → JPEG bytes.
//!
//! JPEG is used because inverted pages are mostly flat dark areas that
//! compress very well, and every PDF reader decodes `DCTDecode` natively.
//! Alpha is dropped: pages are opaque rectangles placed on opaque pages.

use crate::error::DarkPdfError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

/// A compressed page image plus its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPageImage {
    /// JPEG bitstream.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedPageImage {
    pub const MIME_TYPE: &'static str = "image/jpeg";
}

/// Map a `[0, 1]` quality onto the JPEG encoder's `1..=100` scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    if !quality.is_finite() {
        return 90;
    }
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode a rasterised page as JPEG.
///
/// Consumes the raster so the RGBA buffer is released as soon as the RGB
/// copy exists. `page` is the 1-based page number, used only to attribute
/// failures.
pub fn encode_page(
    pixels: RgbaImage,
    quality: f32,
    page: usize,
) -> Result<EncodedPageImage, DarkPdfError> {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return Err(DarkPdfError::EncodingFailed {
            page,
            detail: format!("cannot encode an empty {width}x{height} buffer"),
        });
    }

    // JPEG has no alpha channel; the conversion keeps RGB and discards A.
    let rgb = DynamicImage::ImageRgba8(pixels).into_rgb8();

    let mut data = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut data, jpeg_quality(quality));
    encoder
        .encode_image(&rgb)
        .map_err(|e| DarkPdfError::EncodingFailed {
            page,
            detail: e.to_string(),
        })?;

    debug!(
        "Encoded page {} → {}x{} JPEG, {} bytes",
        page,
        width,
        height,
        data.len()
    );

    Ok(EncodedPageImage {
        data,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    #[test]
    fn encode_small_image() {
        let img = RgbaImage::from_pixel(10, 8, Rgba([255, 0, 0, 255]));
        let encoded = encode_page(img, 0.9, 1).expect("encode should succeed");
        assert_eq!((encoded.width, encoded.height), (10, 8));
        // SOI marker
        assert_eq!(&encoded.data[..2], &[0xFFu8, 0xD8]);

        let decoded = image::load_from_memory(&encoded.data).expect("valid JPEG");
        assert_eq!(decoded.dimensions(), (10, 8));
    }

    #[test]
    fn colour_survives_alpha_drop() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([245, 55, 205, 255]));
        let encoded = encode_page(img, 1.0, 1).unwrap();
        let decoded = image::load_from_memory(&encoded.data).unwrap().to_rgb8();
        let [r, g, b] = decoded.get_pixel(8, 8).0;
        assert!(r.abs_diff(245) <= 4 && g.abs_diff(55) <= 4 && b.abs_diff(205) <= 4);
    }

    #[test]
    fn transparent_pixels_are_flattened() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let encoded = encode_page(img, 1.0, 1).unwrap();
        let decoded = image::load_from_memory(&encoded.data).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn lower_quality_is_smaller() {
        let img = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8, 255])
        });
        let hi = encode_page(img.clone(), 1.0, 1).unwrap();
        let lo = encode_page(img, 0.1, 1).unwrap();
        assert!(lo.data.len() < hi.data.len());
    }

    #[test]
    fn empty_buffer_is_an_encoding_error() {
        let err = encode_page(RgbaImage::new(0, 5), 0.9, 3).unwrap_err();
        assert!(matches!(err, DarkPdfError::EncodingFailed { page: 3, .. }));
    }

    #[test]
    fn quality_mapping() {
        assert_eq!(jpeg_quality(0.9), 90);
        assert_eq!(jpeg_quality(1.0), 100);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(7.0), 100);
        assert_eq!(jpeg_quality(f32::NAN), 90);
    }
}
