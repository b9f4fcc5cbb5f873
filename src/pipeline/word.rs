//! Word-processor output: HTML markup that desktop word processors open
//! as a `.doc`.
//!
//! Pages are processed in order. A native-text page contributes one
//! paragraph with its extracted text; a scanned page is rasterised and
//! embedded as a base64 JPEG, followed by a page break. Each page's kind is
//! decided once and the page is never rendered twice.

use super::classify::{classify_page, document_mode, DocumentMode, PageKind};
use super::render::{rasterize, RasterPage};
use crate::backend::{ImageKind, PagedDocument, RasterCodec};
use crate::config::RasterPolicy;
use crate::error::{ConvertError, Stage};
use crate::progress::{Progress, ProgressUnit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

const BYTE_ORDER_MARK: &str = "\u{feff}";
const DOCUMENT_OPEN: &str = "<html xmlns:o='urn:schemas-microsoft-com:office:office' \
xmlns:w='urn:schemas-microsoft-com:office:word'><head><meta charset='utf-8'></head><body>";
const DOCUMENT_CLOSE: &str = "</body></html>";

/// Escape text for inclusion in element content.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Paragraph for a native-text page.
pub fn text_fragment(text: &str) -> String {
    format!(
        "<p style=\"page-break-after: always;\">{}</p>",
        escape_markup(text)
    )
}

/// `669.69`, `688.5`, `45`: two decimals at most, trailing zeros dropped.
fn format_points(value: f32) -> String {
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Embedded image for a scanned page, `width_ratio` points per viewport unit.
pub fn image_fragment(page: &RasterPage, width_ratio: f32) -> String {
    format!(
        "<p><img src=\"data:{};base64,{}\" width=\"{}pt\" style=\"max-width:100%\"></p>\
<br style=\"page-break-after: always;\" />",
        ImageKind::Jpeg.mime_type(),
        STANDARD.encode(&page.bytes),
        format_points(page.viewport_width * width_ratio)
    )
}

/// Wrap a body in the document envelope, byte-order mark first.
pub fn wrap_document(body: &str) -> Vec<u8> {
    let mut out = String::with_capacity(
        BYTE_ORDER_MARK.len() + DOCUMENT_OPEN.len() + body.len() + DOCUMENT_CLOSE.len(),
    );
    out.push_str(BYTE_ORDER_MARK);
    out.push_str(DOCUMENT_OPEN);
    out.push_str(body);
    out.push_str(DOCUMENT_CLOSE);
    out.into_bytes()
}

/// A finished word document.
#[derive(Debug, Clone, PartialEq)]
pub struct WordDocument {
    pub bytes: Vec<u8>,
    pub mode: DocumentMode,
    pub pages: usize,
    pub text_pages: usize,
    pub image_pages: usize,
}

/// Build the document for every page of `doc`.
pub fn build_document(
    doc: &dyn PagedDocument,
    text_threshold: usize,
    policy: &RasterPolicy,
    codec: &dyn RasterCodec,
    progress: Progress<'_>,
) -> Result<WordDocument, ConvertError> {
    let total = doc.page_count();
    if total == 0 {
        return Err(ConvertError::corrupt(Stage::Open, "document has no pages"));
    }
    progress.start(ProgressUnit::Page, total);

    let mut body = String::new();
    let mut kinds = Vec::with_capacity(total);

    for number in 1..=total {
        progress.unit_start(number, total);
        let fragment = page_fragment(doc, number, text_threshold, policy, codec);
        let (kind, fragment) = match fragment {
            Ok(ok) => ok,
            Err(e) => {
                progress.unit_error(number, total, &e);
                return Err(e);
            }
        };
        body.push_str(&fragment);
        kinds.push(kind);
        progress.unit_complete(number, total, fragment.len());
    }

    let text_pages = kinds.iter().filter(|k| **k == PageKind::NativeText).count();
    let mode = document_mode(kinds.iter().copied());
    let bytes = wrap_document(&body);
    info!(
        "Word document built: {} pages ({} text, {} image), mode {:?}, {} bytes",
        total,
        text_pages,
        total - text_pages,
        mode,
        bytes.len()
    );
    progress.complete(total, bytes.len());

    Ok(WordDocument {
        bytes,
        mode,
        pages: total,
        text_pages,
        image_pages: total - text_pages,
    })
}

fn page_fragment(
    doc: &dyn PagedDocument,
    number: usize,
    text_threshold: usize,
    policy: &RasterPolicy,
    codec: &dyn RasterCodec,
) -> Result<(PageKind, String), ConvertError> {
    let page = classify_page(doc, number, text_threshold)?;
    match page.kind() {
        PageKind::NativeText => Ok((PageKind::NativeText, text_fragment(&page.text))),
        PageKind::ScannedRaster => {
            let raster = rasterize(doc, number, policy.embed_scale, policy.embed_quality, codec)?;
            debug!("Page {} embedded as image ({} bytes)", number, raster.bytes.len());
            Ok((
                PageKind::ScannedRaster,
                image_fragment(&raster, policy.embed_width_ratio),
            ))
        }
    }
}
