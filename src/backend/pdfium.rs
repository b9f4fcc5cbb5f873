//! Page source backed by pdfium via `pdfium-render`.
//!
//! The pdfium shared library is bound once per process and kept in a
//! [`OnceCell`]. Binding looks at `PDFIUM_LIB_PATH` first and then the
//! system loader path. Documents borrow the binding, so an opened
//! [`PdfiumDocument`] can never outlive it.
//!
//! pdfium keeps thread-local state and is not safe to drive from async
//! code; the async entry points in [`crate::convert`] run the whole
//! pipeline inside `spawn_blocking` for that reason.

use super::{PageSource, PagedDocument, TextRun};
use crate::error::{ConvertError, Stage};
use image::DynamicImage;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

static PDFIUM: OnceCell<Pdfium> = OnceCell::new();

/// Resolve the process-wide pdfium binding, binding on first use.
pub fn pdfium() -> Result<&'static Pdfium, ConvertError> {
    PDFIUM.get_or_try_init(bind).map_err(|detail| ConvertError::RenderUnavailable { detail })
}

fn bind() -> Result<Pdfium, String> {
    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(&env_path);
        // Accept either the library file itself or the directory holding it.
        let lib = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&path)
        } else {
            path
        };
        if lib.exists() {
            info!("Binding pdfium from {}", lib.display());
            return Pdfium::bind_to_library(&lib)
                .map(Pdfium::new)
                .map_err(|e| format!("failed to bind '{}': {e}", lib.display()));
        }
        debug!("PDFIUM_LIB_PATH '{}' not found; trying system library", env_path);
    }
    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| format!("no pdfium library found on the system path: {e}"))
}

/// [`PageSource`] implemented with pdfium.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumPages;

impl PageSource for PdfiumPages {
    fn open<'a>(
        &'a self,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn PagedDocument + 'a>, ConvertError> {
        let pdfium = pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| map_open_error(e, password.is_some()))?;
        let page_count = document.pages().len() as usize;
        info!("PDF loaded: {} pages", page_count);
        Ok(Box::new(PdfiumDocument {
            document,
            page_count,
        }))
    }
}

fn map_open_error(e: PdfiumError, had_password: bool) -> ConvertError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            ConvertError::WrongPassword
        } else {
            ConvertError::PasswordRequired
        }
    } else {
        ConvertError::corrupt(Stage::Open, err_str)
    }
}

/// Baseline of a text segment: the first glyph's origin when pdfium
/// reports one, else the bottom of the segment box. The box bottom sits on
/// the lowest descender, so it is only a fallback.
fn baseline(first_origin_y: Option<f32>, box_bottom: f32) -> f32 {
    first_origin_y.filter(|y| y.is_finite()).unwrap_or(box_bottom)
}

/// An open pdfium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    page_count: usize,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, number: usize, stage: Stage) -> Result<PdfPage<'a>, ConvertError> {
        if number == 0 || number > self.page_count {
            return Err(ConvertError::Internal(format!(
                "page {number} is out of range (document has {} pages)",
                self.page_count
            )));
        }
        let index = u16::try_from(number - 1)
            .map_err(|_| ConvertError::corrupt(stage, format!("page index {number} too large")))?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| ConvertError::corrupt(stage, format!("page {number}: {:?}", e)))
    }
}

impl PagedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_width(&self, number: usize) -> Result<f32, ConvertError> {
        Ok(self.page(number, Stage::Render)?.width().value)
    }

    fn text_runs(&self, number: usize) -> Result<Vec<TextRun>, ConvertError> {
        let page = self.page(number, Stage::Classify)?;
        let text = page
            .text()
            .map_err(|e| ConvertError::corrupt(Stage::Classify, format!("page {number}: {:?}", e)))?;

        let runs: Vec<TextRun> = text
            .segments()
            .iter()
            .map(|segment| {
                let bounds = segment.bounds();
                let origin = segment
                    .chars()
                    .ok()
                    .and_then(|chars| chars.iter().next().and_then(|c| c.origin_y().ok()))
                    .map(|y| y.value);
                TextRun::new(
                    segment.text(),
                    bounds.left().value,
                    baseline(origin, bounds.bottom().value),
                )
            })
            .collect();
        debug!("Page {}: {} text runs", number, runs.len());
        Ok(runs)
    }

    fn render(&self, number: usize, scale: f32) -> Result<DynamicImage, ConvertError> {
        let page = self.page(number, Stage::Render)?;
        let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ConvertError::RenderUnavailable {
                detail: format!("page {number}: {:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            number,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
