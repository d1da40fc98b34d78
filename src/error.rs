//! Error types for the pdf2dark library.
//!
//! Every failure in a conversion is fatal: a single corrupt page aborts the
//! whole document and no partial artifact is returned. All of them are
//! therefore variants of one enum, [`DarkPdfError`], and each variant belongs
//! to exactly one [`ErrorKind`] so callers (a CLI, a UI status line) can react
//! to the class of failure without matching every variant.
//!
//! | Kind | Raised |
//! |------|--------|
//! | [`ErrorKind::Validation`]    | before the pipeline starts (bad path, not a PDF, too large, bad config) |
//! | [`ErrorKind::DocumentOpen`]  | while opening the source; the pipeline never reaches a page |
//! | [`ErrorKind::PageDecode`]    | a specific page failed to rasterise or place |
//! | [`ErrorKind::Encoding`]      | JPEG re-encoding of a page failed |
//! | [`ErrorKind::Serialization`] | final assembly or writing of the output artifact failed |
//! | [`ErrorKind::Cancelled`]     | the caller raised the cancellation flag between pages |

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`DarkPdfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Validation,
    DocumentOpen,
    PageDecode,
    Encoding,
    Serialization,
    Cancelled,
    Internal,
}

/// All errors returned by the pdf2dark library.
#[derive(Debug, Error)]
pub enum DarkPdfError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes do not start with the `%PDF` signature.
    #[error("Input is not a PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    /// The input exceeds the configured size ceiling.
    #[error("File '{path}' is {size} bytes; the limit is {limit} bytes")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
executable, or install pdfium system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases"
    )]
    PdfiumBindingFailed(String),

    // ── Page errors ───────────────────────────────────────────────────────
    /// Requested page number is outside `1..=total`.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The decoder could not rasterise a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    PageDecodeFailed { page: usize, detail: String },

    /// An encoded page image has no usable area and cannot be placed.
    #[error("Page {page} produced a degenerate {width}x{height} image")]
    DegenerateImage { page: usize, width: u32, height: u32 },

    /// Lossy re-encoding of a rasterised page failed.
    #[error("Image encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Final assembly of the output artifact failed.
    #[error("Failed to serialise output document: {0}")]
    SerializationFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Control ───────────────────────────────────────────────────────────
    /// The cancellation flag was raised between pages.
    #[error("Conversion cancelled after {pages_completed} of {pages_total} pages")]
    Cancelled {
        pages_completed: usize,
        pages_total: usize,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DarkPdfError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::NotAPdf { .. }
            | Self::FileTooLarge { .. }
            | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::CorruptPdf { .. }
            | Self::PasswordRequired
            | Self::WrongPassword
            | Self::PdfiumBindingFailed(_) => ErrorKind::DocumentOpen,
            Self::PageOutOfRange { .. }
            | Self::PageDecodeFailed { .. }
            | Self::DegenerateImage { .. } => ErrorKind::PageDecode,
            Self::EncodingFailed { .. } => ErrorKind::Encoding,
            Self::SerializationFailed(_) | Self::OutputWriteFailed { .. } => {
                ErrorKind::Serialization
            }
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The 1-based page the failure is attributed to, when there is one.
    pub fn page(&self) -> Option<usize> {
        match self {
            Self::PageOutOfRange { page, .. }
            | Self::PageDecodeFailed { page, .. }
            | Self::DegenerateImage { page, .. }
            | Self::EncodingFailed { page, .. } => Some(*page),
            _ => None,
        }
    }
}
