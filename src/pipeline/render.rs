//! Page rasterisation: render one page and encode it as JPEG.
//!
//! The bitmap lives only inside [`rasterize`]; callers receive the encoded
//! bytes and dimensions, so a multi-page run never holds more than one
//! decoded page in memory.

use crate::backend::{ImageKind, PagedDocument, RasterCodec};
use crate::error::{ConvertError, Stage};
use tracing::debug;

/// One rendered, encoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterPage {
    /// 1-based page number.
    pub number: usize,
    /// Rendered width in pixels.
    pub width: u32,
    /// Rendered height in pixels.
    pub height: u32,
    /// Page width in points times the render scale, before pixel rounding.
    pub viewport_width: f32,
    /// JPEG bytes.
    pub bytes: Vec<u8>,
}

/// Render page `number` at `scale` and JPEG-encode it at `quality` (0, 1].
pub fn rasterize(
    doc: &dyn PagedDocument,
    number: usize,
    scale: f32,
    quality: f32,
    codec: &dyn RasterCodec,
) -> Result<RasterPage, ConvertError> {
    let bitmap = doc
        .render(number, scale)
        .map_err(|e| e.at_stage(Stage::Render))?;
    let (width, height) = (bitmap.width(), bitmap.height());
    if width == 0 || height == 0 {
        return Err(ConvertError::corrupt(
            Stage::Render,
            format!("page {number} rendered to an empty bitmap"),
        ));
    }

    let viewport_width = doc
        .page_width(number)
        .map_err(|e| e.at_stage(Stage::Render))?
        * scale;
    let bytes = codec.encode(&bitmap, ImageKind::Jpeg, quality)?;
    drop(bitmap);

    debug!(
        "Page {} rasterised at {:.1}× → {}×{} px, {} bytes",
        number,
        scale,
        width,
        height,
        bytes.len()
    );
    Ok(RasterPage {
        number,
        width,
        height,
        viewport_width,
        bytes,
    })
}
