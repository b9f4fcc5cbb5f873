//! Capability interfaces the pipelines consume, and their native adapters.
//!
//! Each trait exposes only the operations the pipelines actually call.
//! Pipelines never reach for a library directly: they receive a
//! [`Capabilities`] bundle, which makes every stage testable with in-memory
//! fakes and keeps third-party surface area out of the core contracts.
//!
//! | Trait | Native adapter | Library |
//! |-------|----------------|---------|
//! | [`PageSource`] / [`PagedDocument`] | [`pdfium::PdfiumPages`] | pdfium-render |
//! | [`RasterCodec`] | [`raster::ImageCodec`] | image |
//! | [`AudioDecoder`] | [`audio::SymphoniaDecoder`] | symphonia |
//! | [`Mp3EncoderFactory`] / [`BlockEncoder`] | [`lame::LameEncoderFactory`] | mp3lame-encoder |
//! | [`ArchiveFactory`] / [`ArchiveWriter`] | [`archive::ZipArchiveFactory`] | zip |

pub mod archive;
pub mod audio;
#[cfg(test)]
pub(crate) mod fake;
pub mod lame;
pub mod pdfium;
pub mod raster;

use crate::error::ConvertError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

// ── Paged documents ──────────────────────────────────────────────────────

/// One positioned run of text as extracted from a page.
///
/// Coordinates are in document space: `y` is the baseline and grows upward
/// from the bottom of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

impl TextRun {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// Opens paged documents from raw bytes.
pub trait PageSource: Send + Sync {
    /// Open `bytes` as a document. The returned handle borrows both the
    /// adapter and the bytes for its whole lifetime.
    fn open<'a>(
        &'a self,
        bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn PagedDocument + 'a>, ConvertError>;
}

/// An opened document. Page numbers are 1-based.
pub trait PagedDocument {
    /// Number of pages, fixed at open time.
    fn page_count(&self) -> usize;

    /// Width of page `number` in points, unrounded.
    fn page_width(&self, number: usize) -> Result<f32, ConvertError>;

    /// Text runs of page `number`, in extraction order.
    fn text_runs(&self, number: usize) -> Result<Vec<TextRun>, ConvertError>;

    /// Rasterise page `number` at `scale` × its natural size in points.
    fn render(&self, number: usize, scale: f32) -> Result<DynamicImage, ConvertError>;
}

// ── Raster codec ─────────────────────────────────────────────────────────

/// Compressed image formats the raster codec can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }
}

/// Decodes image files and encodes bitmaps.
pub trait RasterCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ConvertError>;

    /// Encode `image` as `kind`. `quality` is in (0, 1] and ignored by
    /// lossless formats.
    fn encode(
        &self,
        image: &DynamicImage,
        kind: ImageKind,
        quality: f32,
    ) -> Result<Vec<u8>, ConvertError>;
}

// ── Audio ────────────────────────────────────────────────────────────────

/// Decoded PCM: one `Vec<f32>` per channel, samples nominally in [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }
}

/// Decodes the first audio track of a media container.
pub trait AudioDecoder: Send + Sync {
    /// `hint` is an optional file extension used to speed up probing.
    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> Result<DecodedAudio, ConvertError>;
}

/// Creates MP3 encoder sessions.
pub trait Mp3EncoderFactory: Send + Sync {
    fn create(
        &self,
        channels: u8,
        sample_rate: u32,
        bitrate_kbps: u32,
    ) -> Result<Box<dyn BlockEncoder>, ConvertError>;
}

/// A single MP3 encoding session.
pub trait BlockEncoder {
    /// Encode one block. `right` is `None` for mono sessions. The returned
    /// bytes may be empty while the encoder buffers.
    fn encode_block(&mut self, left: &[i16], right: Option<&[i16]>)
        -> Result<Vec<u8>, ConvertError>;

    /// Drain buffered frames at end of stream.
    fn flush(&mut self) -> Result<Vec<u8>, ConvertError>;
}

// ── Archives ─────────────────────────────────────────────────────────────

/// Creates archive writers.
pub trait ArchiveFactory: Send + Sync {
    fn create(&self) -> Box<dyn ArchiveWriter>;
}

/// Accumulates files and produces a single compressed container.
pub trait ArchiveWriter {
    fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ConvertError>;

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ConvertError>;
}

// ── Bundle ───────────────────────────────────────────────────────────────

/// The set of capabilities a conversion runs against.
pub struct Capabilities {
    pub pages: Box<dyn PageSource>,
    pub raster: Box<dyn RasterCodec>,
    pub audio: Box<dyn AudioDecoder>,
    pub mp3: Box<dyn Mp3EncoderFactory>,
    pub archive: Box<dyn ArchiveFactory>,
}

impl Capabilities {
    /// Production adapters. pdfium is bound lazily on first document open
    /// and then shared for the rest of the process.
    pub fn native() -> Self {
        Self {
            pages: Box::new(pdfium::PdfiumPages),
            raster: Box::new(raster::ImageCodec),
            audio: Box::new(audio::SymphoniaDecoder),
            mp3: Box::new(lame::LameEncoderFactory),
            archive: Box::new(archive::ZipArchiveFactory),
        }
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
