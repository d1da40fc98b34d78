//! Output types: the produced artifact, per-page records and run statistics.

use crate::pipeline::compose::{PageBounds, Placement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Format of the produced artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One image-only PDF page per source page.
    #[default]
    Pdf,
    /// A single self-contained HTML page with every page embedded as an image.
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
        }
    }

    /// Appended to the input's file stem when naming the output.
    pub fn name_suffix(&self) -> &'static str {
        match self {
            Self::Pdf => "_dark",
            Self::Html => "_dark_mode",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Html => "text/html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "html" | "htm" => Ok(Self::Html),
            other => Err(format!("unknown output format '{other}' (expected pdf or html)")),
        }
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The serialised artifact.
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    /// File name a caller should offer for download or saving.
    pub suggested_filename: String,
    /// One record per output page, in order.
    pub pages: Vec<PageSummary>,
    /// Present when the source was opened through pdfium.
    pub metadata: Option<DocumentMetadata>,
    pub stats: ConversionStats,
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// 1-based page number.
    pub page_num: usize,
    /// Raster size in pixels.
    pub raster_width: u32,
    pub raster_height: u32,
    /// Size of the JPEG stream embedded for this page.
    pub encoded_bytes: usize,
    pub bounds: PageBounds,
    pub placement: Placement,
}

/// Timing and size statistics for a conversion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Sum of all embedded JPEG streams.
    pub encoded_image_bytes: usize,
    /// Time spent in the decoder.
    pub render_duration_ms: u64,
    /// Time spent inverting, encoding and placing.
    pub compose_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Document information read from the source PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
