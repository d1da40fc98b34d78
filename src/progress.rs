//! Progress reporting for conversions.
//!
//! Two pieces live here:
//!
//! * [`ConversionProgress`]: the observable state `{pages_completed,
//!   pages_total, phase}` recomputed after every step, with
//!   [`ConversionProgress::fraction`] mapping it onto fixed bands:
//!
//!   | Phase | Overall progress |
//!   |-------|------------------|
//!   | `Initializing` | 0 % |
//!   | `Reading`      | 10 % |
//!   | `Rendering`    | 35 % → 90 %, linear in `pages_completed / pages_total` |
//!   | `Finalizing`   | 90 % |
//!   | `Done`         | 100 % |
//!
//! * [`ConversionProgressCallback`]: an observer trait injected through
//!   [`crate::config::ConversionConfigBuilder::progress_callback`].
//!
//! # Example
//!
//! ```rust
//! use pdf2dark::{ConversionConfig, ConversionProgress, ConversionProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ConversionProgressCallback for Printer {
//!     fn on_progress(&self, progress: &ConversionProgress) {
//!         eprintln!("{:>3}% {:?}", progress.percent(), progress.phase);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::DarkPdfError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const READING_FRACTION: f64 = 0.10;
const RENDER_START: f64 = 0.35;
const RENDER_END: f64 = 0.90;

/// Coarse stage of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Configuration checked, nothing read yet.
    Initializing,
    /// Source bytes loaded; document being opened.
    Reading,
    /// Pages being rasterised, inverted, encoded and placed.
    Rendering,
    /// Output document being serialised.
    Finalizing,
    /// Output bytes available.
    Done,
}

/// Snapshot of how far a conversion has come.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionProgress {
    pub pages_completed: usize,
    pub pages_total: usize,
    pub phase: Phase,
}

impl ConversionProgress {
    pub fn new(phase: Phase, pages_completed: usize, pages_total: usize) -> Self {
        Self {
            pages_completed: pages_completed.min(pages_total),
            pages_total,
            phase,
        }
    }

    /// Overall progress in `[0, 1]`. Equals `1.0` only in [`Phase::Done`].
    pub fn fraction(&self) -> f64 {
        match self.phase {
            Phase::Initializing => 0.0,
            Phase::Reading => READING_FRACTION,
            Phase::Rendering => {
                if self.pages_total == 0 {
                    RENDER_END
                } else {
                    let done = self.pages_completed as f64 / self.pages_total as f64;
                    (RENDER_START + (RENDER_END - RENDER_START) * done).min(RENDER_END)
                }
            }
            Phase::Finalizing => RENDER_END,
            Phase::Done => 1.0,
        }
    }

    /// [`Self::fraction`] as a whole percentage.
    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round() as u8
    }
}

/// Called by the conversion pipeline as it advances.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline calls them from whichever thread runs
/// the conversion (a `spawn_blocking` worker for the async entry points), so
/// implementations must be `Send + Sync`.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the page count is known, before any page is rendered.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after every state change with the recomputed progress.
    ///
    /// After [`Self::on_conversion_failed`] it is called once more with a
    /// reset to 0 % (`Phase::Initializing`), outside the monotonic sequence.
    fn on_progress(&self, progress: &ConversionProgress) {
        let _ = progress;
    }

    /// Called just before a page is rasterised.
    ///
    /// * `page_num`: 1-indexed page number
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been placed in the output document.
    ///
    /// * `encoded_len`: byte length of the page's JPEG
    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_len: usize) {
        let _ = (page_num, total_pages, encoded_len);
    }

    /// Called once when the conversion terminates with an error.
    fn on_conversion_failed(&self, error: &DarkPdfError) {
        let _ = error;
    }

    /// Called once after the output has been serialised.
    ///
    /// * `output_len`: byte length of the finished artifact
    fn on_conversion_complete(&self, total_pages: usize, output_len: usize) {
        let _ = (total_pages, output_len);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn bands_are_fixed() {
        assert_eq!(ConversionProgress::new(Phase::Initializing, 0, 4).percent(), 0);
        assert_eq!(ConversionProgress::new(Phase::Reading, 0, 4).percent(), 10);
        assert_eq!(ConversionProgress::new(Phase::Rendering, 0, 4).percent(), 35);
        assert_eq!(ConversionProgress::new(Phase::Finalizing, 4, 4).percent(), 90);
        assert_eq!(ConversionProgress::new(Phase::Done, 4, 4).percent(), 100);
    }

    #[test]
    fn rendering_is_linear_in_pages() {
        let half = ConversionProgress::new(Phase::Rendering, 2, 4).fraction();
        assert!((half - 0.625).abs() < 1e-9, "got {half}");
        let all = ConversionProgress::new(Phase::Rendering, 4, 4).fraction();
        assert!((all - 0.90).abs() < 1e-9);
    }

    #[test]
    fn only_done_reaches_one() {
        for phase in [
            Phase::Initializing,
            Phase::Reading,
            Phase::Rendering,
            Phase::Finalizing,
        ] {
            for done in 0..=10 {
                assert!(ConversionProgress::new(phase, done, 10).fraction() < 1.0);
            }
        }
        assert_eq!(ConversionProgress::new(Phase::Done, 0, 0).fraction(), 1.0);
    }

    #[test]
    fn zero_pages_does_not_divide_by_zero() {
        let p = ConversionProgress::new(Phase::Rendering, 0, 0);
        assert!(p.fraction().is_finite());
    }

    #[test]
    fn completed_is_clamped_to_total() {
        let p = ConversionProgress::new(Phase::Rendering, 9, 3);
        assert_eq!(p.pages_completed, 3);
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_progress(&ConversionProgress::new(Phase::Reading, 0, 5));
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 42);
        cb.on_conversion_failed(&DarkPdfError::WrongPassword);
        cb.on_conversion_complete(5, 1024);
    }

    #[test]
    fn arc_dyn_callback_works() {
        struct Counter(AtomicUsize);
        impl ConversionProgressCallback for Counter {
            fn on_page_complete(&self, _page: usize, _total: usize, _len: usize) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let cb: ProgressCallback = counter.clone();
        cb.on_page_complete(1, 2, 10);
        cb.on_page_complete(2, 2, 10);
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }
}
