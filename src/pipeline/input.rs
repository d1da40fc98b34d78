//! Input validation and output naming.
//!
//! Every check here runs before a pdfium document is opened, so a bad input
//! is rejected with a specific message instead of a decoder error. The same
//! checks apply to bytes that never touched the file system
//! ([`validate_bytes`]) and to files on disk ([`read_local`]).

use crate::error::DarkPdfError;
use crate::output::OutputFormat;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// MIME type accepted at the boundary.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Validate and read a local PDF.
///
/// Checks existence, read permission, size (from metadata, before reading)
/// and the `%PDF` signature.
pub fn read_local(path: &Path, max_file_size: u64) -> Result<Vec<u8>, DarkPdfError> {
    let path_buf = path.to_path_buf();

    if !path.exists() {
        return Err(DarkPdfError::FileNotFound { path: path_buf });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DarkPdfError::PermissionDenied { path: path_buf });
        }
        Err(_) => return Err(DarkPdfError::FileNotFound { path: path_buf }),
    };

    let size = file
        .metadata()
        .map_err(|e| DarkPdfError::Internal(format!("stat '{}': {}", path.display(), e)))?
        .len();
    check_size(&path_buf, size, max_file_size)?;

    let mut bytes = Vec::with_capacity(size as usize);
    file.read_to_end(&mut bytes).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => DarkPdfError::PermissionDenied {
            path: path_buf.clone(),
        },
        _ => DarkPdfError::Internal(format!("read '{}': {}", path.display(), e)),
    })?;

    check_magic(&path_buf, &bytes)?;

    debug!("Validated local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// Validate an in-memory PDF. `label` names the source in error messages.
pub fn validate_bytes(bytes: &[u8], label: &str, max_file_size: u64) -> Result<(), DarkPdfError> {
    let path = PathBuf::from(label);
    check_size(&path, bytes.len() as u64, max_file_size)?;
    check_magic(&path, bytes)
}

fn check_size(path: &Path, size: u64, limit: u64) -> Result<(), DarkPdfError> {
    if size > limit {
        return Err(DarkPdfError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }
    Ok(())
}

fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), DarkPdfError> {
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(DarkPdfError::NotAPdf {
            path: path.to_path_buf(),
            magic: bytes.iter().take(PDF_MAGIC.len()).copied().collect(),
        });
    }
    Ok(())
}

/// File stem used for naming outputs; `"document"` when the path has none.
pub fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

/// Output file name for `input` in `format`: `report.pdf` → `report_dark.pdf`.
pub fn suggested_filename(input: &Path, format: OutputFormat) -> String {
    filename_for_stem(&file_stem(input), format)
}

/// Output file name for an already-extracted stem.
pub fn filename_for_stem(stem: &str, format: OutputFormat) -> String {
    format!("{}{}.{}", stem, format.name_suffix(), format.extension())
}

/// Default output path: the suggested file name, beside the input.
pub fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_file_name(suggested_filename(input, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(contents).unwrap();
        f
    }

    #[test]
    fn missing_file() {
        let err = read_local(Path::new("/nonexistent/x.pdf"), u64::MAX).unwrap_err();
        assert!(matches!(err, DarkPdfError::FileNotFound { .. }));
    }

    #[test]
    fn reads_valid_pdf() {
        let f = temp_file(b"%PDF-1.7\n%%EOF\n");
        let bytes = read_local(f.path(), 1024).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }

    #[test]
    fn rejects_wrong_magic() {
        let f = temp_file(b"\x89PNG\r\n");
        match read_local(f.path(), 1024).unwrap_err() {
            DarkPdfError::NotAPdf { magic, .. } => assert_eq!(magic, b"\x89PNG".to_vec()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn short_file_is_not_a_pdf() {
        let f = temp_file(b"%P");
        assert!(matches!(
            read_local(f.path(), 1024),
            Err(DarkPdfError::NotAPdf { .. })
        ));
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        let data = b"%PDF-1.4 padding";
        assert!(validate_bytes(data, "mem.pdf", data.len() as u64).is_ok());
        match validate_bytes(data, "mem.pdf", data.len() as u64 - 1).unwrap_err() {
            DarkPdfError::FileTooLarge { size, limit, .. } => {
                assert_eq!(size, data.len() as u64);
                assert_eq!(limit, data.len() as u64 - 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn oversize_file_rejected_before_magic() {
        let f = temp_file(b"not a pdf at all");
        assert!(matches!(
            read_local(f.path(), 4),
            Err(DarkPdfError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn naming() {
        let p = Path::new("/docs/Annual Report.pdf");
        assert_eq!(
            suggested_filename(p, OutputFormat::Pdf),
            "Annual Report_dark.pdf"
        );
        assert_eq!(
            suggested_filename(p, OutputFormat::Html),
            "Annual Report_dark_mode.html"
        );
        assert_eq!(
            default_output_path(p, OutputFormat::Pdf),
            PathBuf::from("/docs/Annual Report_dark.pdf")
        );
        assert_eq!(file_stem(Path::new("/")), "document");
    }
}
