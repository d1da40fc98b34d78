//! Colour inversion: the dark-mode transform applied to every raster page.
//!
//! The canonical transform is plain RGB inversion baked into the pixels:
//! every red, green and blue channel becomes `255 - v`, alpha is untouched.
//! It is an exact involution and needs no colour-space knowledge, which keeps
//! the output artifact a faithful negative of the rendered page.
//!
//! The transform sits behind [`PixelTransform`] so a different strategy
//! (hue-preserving inversion, contrast compensation) can be dropped in through
//! [`crate::config::ConversionConfigBuilder::transform`] without touching the
//! pipeline.

use image::RgbaImage;

/// An in-place, per-pixel colour transform.
pub trait PixelTransform: Send + Sync {
    /// Short identifier used in logs and config dumps.
    fn name(&self) -> &'static str;

    /// Transform every pixel of `image` in place.
    fn apply(&self, image: &mut RgbaImage);
}

/// `255 - v` on R, G and B; alpha unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RgbInvert;

impl PixelTransform for RgbInvert {
    fn name(&self) -> &'static str {
        "rgb-invert"
    }

    fn apply(&self, image: &mut RgbaImage) {
        invert(image);
    }
}

/// Invert the colour channels of `image` in place.
pub fn invert(image: &mut RgbaImage) {
    for px in image.chunks_exact_mut(4) {
        px[0] = 255 - px[0];
        px[1] = 255 - px[1];
        px[2] = 255 - px[2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn inverts_reference_pixel() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([10, 200, 50, 255]));
        invert(&mut img);
        assert!(img.pixels().all(|p| *p == Rgba([245, 55, 205, 255])));
    }

    #[test]
    fn involution_for_every_channel_value() {
        // 256 × 1 strip covering each value once per channel, with alpha varying too.
        let mut img = RgbaImage::from_fn(256, 1, |x, _| {
            let v = x as u8;
            Rgba([v, v.wrapping_add(85), v.wrapping_add(170), v])
        });
        let original = img.clone();

        invert(&mut img);
        for (x, px) in img.pixels().enumerate() {
            let v = x as u8;
            assert_eq!(px[0], 255 - v);
            assert_eq!(px[3], v, "alpha must be untouched");
        }

        invert(&mut img);
        assert_eq!(img, original);
    }

    #[test]
    fn black_and_white_swap() {
        let mut img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 128])
            } else {
                Rgba([255, 255, 255, 0])
            }
        });
        RgbInvert.apply(&mut img);
        assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 128]));
        assert_eq!(*img.get_pixel(1, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn empty_image_is_noop() {
        let mut img = RgbaImage::new(0, 0);
        invert(&mut img);
        assert_eq!(img.dimensions(), (0, 0));
    }
}
