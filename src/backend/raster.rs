//! Raster codec backed by the `image` crate.
//!
//! JPEG has no alpha channel, so every bitmap is composited onto an opaque
//! white canvas before encoding. Transparent regions of a PNG logo come out
//! white instead of black.

use super::{ImageKind, RasterCodec};
use crate::error::{ConvertError, Stage};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbaImage, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// [`RasterCodec`] implemented with `image`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl RasterCodec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ConvertError::corrupt(Stage::Open, format!("image decode failed: {e}")))?;
        debug!(width = img.width(), height = img.height(), "Image decoded");
        Ok(img)
    }

    fn encode(
        &self,
        image: &DynamicImage,
        kind: ImageKind,
        quality: f32,
    ) -> Result<Vec<u8>, ConvertError> {
        let mut buf = Vec::new();
        match kind {
            ImageKind::Jpeg => {
                let rgb = flatten_onto_white(image);
                let encoder = JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality));
                rgb.write_with_encoder(encoder)
                    .map_err(|e| ConvertError::encode(Stage::Encode, format!("JPEG: {e}")))?;
            }
            ImageKind::Png => {
                image
                    .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                    .map_err(|e| ConvertError::encode(Stage::Encode, format!("PNG: {e}")))?;
            }
        }
        if buf.is_empty() {
            return Err(ConvertError::encode(Stage::Encode, "codec produced no bytes"));
        }
        Ok(buf)
    }
}

/// Map a (0, 1] quality factor onto the encoder's 1–100 scale.
pub fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Composite `image` over opaque white and drop the alpha channel.
pub fn flatten_onto_white(image: &DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
    let rgb: RgbImage = DynamicImage::ImageRgba8(canvas).to_rgb8();
    DynamicImage::ImageRgb8(rgb)
}
