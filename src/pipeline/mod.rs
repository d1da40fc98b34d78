//! Pipeline stages for PDF dark-mode conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped (another decoder, another transform)
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ invert ──▶ encode ──▶ compose ──▶ assemble
//! (bytes)  (pdfium)   (pixels)   (JPEG)    (fit+centre)  (PDF/HTML)
//! ```
//!
//! 1. [`input`]:    validate path/bytes at the boundary, name the output
//! 2. [`render`]:   rasterise one page at `scale`; pdfium is not async-safe,
//!    so callers run it in `spawn_blocking`
//! 3. [`invert`]:   apply the dark-mode [`invert::PixelTransform`] in place
//! 4. [`encode`]:   JPEG-encode the transformed raster
//! 5. [`compose`]:  aspect-fit the image onto an output page and centre it
//! 6. [`assemble`]: accumulate pages and serialise the final artifact

pub mod assemble;
pub mod compose;
pub mod encode;
pub mod input;
pub mod invert;
pub mod render;
