//! Page composition: fit an encoded page image onto an output page.
//!
//! The image is scaled uniformly so it fits entirely inside the page, then
//! centred; the unused band (left/right or top/bottom) is letterboxing.
//! Coordinates here use a top-left origin in PDF points; assemblers that need
//! a different origin convert on their side.

use crate::error::DarkPdfError;
use crate::pipeline::assemble::DocumentAssembler;
use crate::pipeline::encode::EncodedPageImage;
use serde::{Deserialize, Serialize};

/// Printable area of one output page, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBounds {
    pub width: f32,
    pub height: f32,
}

impl PageBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Where an image lands on its page (top-left origin, points).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Largest centred rectangle with the image's aspect ratio that fits `bounds`.
///
/// Returns `None` when either the image or the page has no area.
pub fn fit_centered(image_width: u32, image_height: u32, bounds: PageBounds) -> Option<Placement> {
    if image_width == 0 || image_height == 0 || !bounds.is_usable() {
        return None;
    }

    let image_aspect = image_width as f32 / image_height as f32;
    let page_aspect = bounds.width / bounds.height;

    let (width, height) = if image_aspect > page_aspect {
        (bounds.width, bounds.width / image_aspect)
    } else {
        (bounds.height * image_aspect, bounds.height)
    };

    Some(Placement {
        x: (bounds.width - width) / 2.0,
        y: (bounds.height - height) / 2.0,
        width,
        height,
    })
}

/// Append one page of size `bounds` to `output` and draw `image` centred on it.
///
/// `page` is the 1-based source page number, used only to attribute failures.
/// A degenerate image is reported as [`DarkPdfError::DegenerateImage`] before
/// anything is appended, so the output never gains a half-built page.
pub fn place(
    output: &mut dyn DocumentAssembler,
    image: &EncodedPageImage,
    bounds: PageBounds,
    page: usize,
) -> Result<Placement, DarkPdfError> {
    let placement =
        fit_centered(image.width, image.height, bounds).ok_or(DarkPdfError::DegenerateImage {
            page,
            width: image.width,
            height: image.height,
        })?;

    output.add_page(bounds)?;
    output.draw_image(image, &placement)?;
    Ok(placement)
}
