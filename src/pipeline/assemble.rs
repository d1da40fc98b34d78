//! Output assembly: collect placed page images into the final artifact.
//!
//! [`DocumentAssembler`] is the narrow interface the pipeline writes through.
//! Two implementations exist:
//!
//! * [`PdfAssembler`]: a new PDF built with `lopdf`; every page is a black
//!   background plus one `DCTDecode` image XObject, so the JPEG bytes are
//!   embedded as-is without re-compression.
//! * [`HtmlAssembler`]: a single self-contained HTML viewer with each page
//!   as a base64 `<img>` positioned by the same placement.

use crate::error::DarkPdfError;
use crate::pipeline::compose::{PageBounds, Placement};
use crate::pipeline::encode::EncodedPageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::fmt::Write as _;
use tracing::debug;

/// Sink for composed pages. Pages are appended in call order.
pub trait DocumentAssembler: Send {
    /// Start a new page of the given size; later draws target it.
    fn add_page(&mut self, bounds: PageBounds) -> Result<(), DarkPdfError>;

    /// Draw `image` on the most recently added page.
    fn draw_image(
        &mut self,
        image: &EncodedPageImage,
        placement: &Placement,
    ) -> Result<(), DarkPdfError>;

    /// Pages appended so far.
    fn page_count(&self) -> usize;

    /// Serialise the accumulated document.
    fn finish(self: Box<Self>) -> Result<Vec<u8>, DarkPdfError>;
}

// ── PDF ──────────────────────────────────────────────────────────────────

/// Page being filled; written out when the next page starts or on finish.
struct OpenPage {
    bounds: PageBounds,
    operations: Vec<Operation>,
    xobjects: Dictionary,
}

/// Builds a PDF page by page with `lopdf`.
pub struct PdfAssembler {
    doc: Document,
    /// Allocated by the first `add_page`; an empty document gets one on finish.
    pages_id: Option<ObjectId>,
    kids: Vec<Object>,
    open: Option<OpenPage>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        Self {
            doc: Document::with_version("1.5"),
            pages_id: None,
            kids: Vec::new(),
            open: None,
        }
    }

    fn close_open_page(&mut self) -> Result<(), DarkPdfError> {
        let Some(page) = self.open.take() else {
            return Ok(());
        };
        let pages_id = self
            .pages_id
            .ok_or_else(|| DarkPdfError::Internal("page open without a page tree".into()))?;

        let content = Content {
            operations: page.operations,
        }
        .encode()
        .map_err(|e| DarkPdfError::SerializationFailed(format!("content stream: {e}")))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => Object::Name(b"Page".to_vec()),
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.bounds.width),
                Object::Real(page.bounds.height),
            ],
            "Resources" => dictionary! {
                "XObject" => page.xobjects,
            },
            "Contents" => Object::Reference(content_id),
        });
        self.kids.push(Object::Reference(page_id));
        Ok(())
    }
}

impl DocumentAssembler for PdfAssembler {
    fn add_page(&mut self, bounds: PageBounds) -> Result<(), DarkPdfError> {
        self.close_open_page()?;
        if self.pages_id.is_none() {
            self.pages_id = Some(self.doc.new_object_id());
        }

        // Fill the page black so letterbox bands match the inverted content.
        let operations = vec![
            Operation::new(
                "rg",
                vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
            ),
            Operation::new(
                "re",
                vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(bounds.width),
                    Object::Real(bounds.height),
                ],
            ),
            Operation::new("f", vec![]),
        ];

        self.open = Some(OpenPage {
            bounds,
            operations,
            xobjects: Dictionary::new(),
        });
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &EncodedPageImage,
        placement: &Placement,
    ) -> Result<(), DarkPdfError> {
        let page = self
            .open
            .as_mut()
            .ok_or_else(|| DarkPdfError::Internal("draw_image called before add_page".into()))?;

        let xobject = Stream::new(
            dictionary! {
                "Type" => Object::Name(b"XObject".to_vec()),
                "Subtype" => Object::Name(b"Image".to_vec()),
                "Width" => Object::Integer(image.width as i64),
                "Height" => Object::Integer(image.height as i64),
                "ColorSpace" => Object::Name(b"DeviceRGB".to_vec()),
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => Object::Name(b"DCTDecode".to_vec()),
            },
            image.data.clone(),
        );
        let image_id = self.doc.add_object(xobject);

        let name = format!("Im{}", page.xobjects.len());
        page.xobjects
            .set(name.as_bytes().to_vec(), Object::Reference(image_id));

        // PDF user space has its origin at the bottom-left corner.
        let y = page.bounds.height - placement.y - placement.height;
        page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(placement.width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(placement.height),
                    Object::Real(placement.x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.kids.len() + usize::from(self.open.is_some())
    }

    fn finish(mut self: Box<Self>) -> Result<Vec<u8>, DarkPdfError> {
        self.close_open_page()?;

        let pages_id = match self.pages_id {
            Some(id) => id,
            None => self.doc.new_object_id(),
        };
        let count = self.kids.len() as i64;
        let kids = std::mem::take(&mut self.kids);
        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => Object::Name(b"Pages".to_vec()),
                "Kids" => kids,
                "Count" => Object::Integer(count),
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => Object::Name(b"Catalog".to_vec()),
            "Pages" => Object::Reference(pages_id),
        });
        let info_id = self.doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("pdf2dark ", env!("CARGO_PKG_VERSION"))),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| DarkPdfError::SerializationFailed(format!("Failed to save PDF: {e}")))?;

        debug!("Serialised PDF: {} pages, {} bytes", count, buffer.len());
        Ok(buffer)
    }
}

// ── HTML ─────────────────────────────────────────────────────────────────

struct HtmlPage {
    bounds: PageBounds,
    image: Option<(String, Placement)>,
}

/// Builds a standalone dark HTML viewer with the pages embedded as base64 JPEGs.
pub struct HtmlAssembler {
    title: String,
    pages: Vec<HtmlPage>,
}

impl HtmlAssembler {
    /// `title` is shown in the browser tab, typically the source file name.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
        }
    }
}

impl DocumentAssembler for HtmlAssembler {
    fn add_page(&mut self, bounds: PageBounds) -> Result<(), DarkPdfError> {
        self.pages.push(HtmlPage {
            bounds,
            image: None,
        });
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &EncodedPageImage,
        placement: &Placement,
    ) -> Result<(), DarkPdfError> {
        let page = self
            .pages
            .last_mut()
            .ok_or_else(|| DarkPdfError::Internal("draw_image called before add_page".into()))?;
        page.image = Some((STANDARD.encode(&image.data), *placement));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, DarkPdfError> {
        let mut html = String::new();
        let title = escape_html(&self.title);

        // fmt::Write for String never fails.
        let fmt_err = |e: std::fmt::Error| DarkPdfError::SerializationFailed(e.to_string());

        write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
<meta charset=\"UTF-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
<meta name=\"color-scheme\" content=\"dark\">\n\
<meta name=\"theme-color\" content=\"#000000\">\n\
<title>Dark Mode PDF - {title}</title>\n\
<style>\n\
:root {{ color-scheme: dark; }}\n\
* {{ margin: 0; padding: 0; box-sizing: border-box; }}\n\
html, body {{ background: #000000; color: #e5e5e5; }}\n\
body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; \
display: flex; flex-direction: column; align-items: center; gap: 16px; padding: 16px 0; }}\n\
.page {{ position: relative; background: #000000; box-shadow: 0 0 0 1px #333; }}\n\
.page img {{ position: absolute; display: block; }}\n\
</style>\n</head>\n<body>\n"
        )
        .map_err(fmt_err)?;

        for (i, page) in self.pages.iter().enumerate() {
            write!(
                html,
                "<section class=\"page\" id=\"page-{}\" style=\"width:{:.2}pt;height:{:.2}pt\">",
                i + 1,
                page.bounds.width,
                page.bounds.height
            )
            .map_err(fmt_err)?;
            if let Some((data, p)) = &page.image {
                write!(
                    html,
                    "<img alt=\"Page {}\" src=\"data:{};base64,{}\" \
style=\"left:{:.2}pt;top:{:.2}pt;width:{:.2}pt;height:{:.2}pt\">",
                    i + 1,
                    EncodedPageImage::MIME_TYPE,
                    data,
                    p.x,
                    p.y,
                    p.width,
                    p.height
                )
                .map_err(fmt_err)?;
            }
            html.push_str("</section>\n");
        }

        html.push_str("</body>\n</html>\n");
        debug!(
            "Serialised HTML viewer: {} pages, {} bytes",
            self.pages.len(),
            html.len()
        );
        Ok(html.into_bytes())
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
