//! Locating and binding the pdfium shared library.
//!
//! Resolution order:
//!
//! 1. `PDFIUM_LIB_PATH`: a library file, or a directory containing one.
//! 2. The current working directory.
//! 3. The system library search path.
//!
//! pdfium is never downloaded; a missing library is reported as
//! [`DarkPdfError::PdfiumBindingFailed`] with installation hints.

use crate::error::DarkPdfError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the library location.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium, trying each location in turn.
pub fn bind_pdfium() -> Result<Pdfium, DarkPdfError> {
    let mut failures: Vec<String> = Vec::new();

    if let Some(path) = env_library_path() {
        match bind_from_path(&path) {
            Ok(pdfium) => return Ok(pdfium),
            Err(e) => {
                warn!("{} is set but binding failed: {}", PDFIUM_LIB_PATH_ENV, e);
                failures.push(e.to_string());
            }
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => {
            debug!("Bound pdfium from {}", local.display());
            return Ok(Pdfium::new(bindings));
        }
        Err(e) => failures.push(format!("{}: {:?}", local.display(), e)),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            debug!("Bound system pdfium");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            failures.push(format!("system library: {:?}", e));
            Err(DarkPdfError::PdfiumBindingFailed(failures.join("; ")))
        }
    }
}

/// Bind to a specific library file, or the platform library inside a directory.
pub fn bind_from_path(path: &Path) -> Result<Pdfium, DarkPdfError> {
    let file = library_file(path);
    Pdfium::bind_to_library(&file)
        .map(Pdfium::new)
        .map_err(|e| DarkPdfError::PdfiumBindingFailed(format!("{}: {:?}", file.display(), e)))
}

fn env_library_path() -> Option<PathBuf> {
    std::env::var_os(PDFIUM_LIB_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}
