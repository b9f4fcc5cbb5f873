//! Output types returned by the conversion entry points.

use crate::pipeline::classify::{DocumentMode, PageKind};
use crate::source::SourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of a produced artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Doc,
    Csv,
    Pptx,
    Jpg,
    Zip,
    Mp3,
}

impl OutputKind {
    /// The short tag, which doubles as the file extension.
    pub fn tag(self) -> &'static str {
        match self {
            OutputKind::Doc => "doc",
            OutputKind::Csv => "csv",
            OutputKind::Pptx => "pptx",
            OutputKind::Jpg => "jpg",
            OutputKind::Zip => "zip",
            OutputKind::Mp3 => "mp3",
        }
    }

    /// MIME type for serving or saving the artifact.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputKind::Doc => "application/msword",
            OutputKind::Csv => "text/csv;charset=utf-8",
            OutputKind::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            OutputKind::Jpg => "image/jpeg",
            OutputKind::Zip => "application/zip",
            OutputKind::Mp3 => "audio/mpeg",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Pipeline-specific facts about how the artifact was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pipeline", rename_all = "snake_case")]
pub enum ConversionDetails {
    /// Size-constrained image compression.
    Compression {
        original_bytes: u64,
        width: u32,
        height: u32,
        /// Final JPEG quality in percent.
        quality: u8,
        attempts: u32,
        /// `false` when the attempt bound was hit above the target size.
        target_met: bool,
    },
    /// PDF to word-processor document.
    Document {
        pages: usize,
        mode: DocumentMode,
        text_pages: usize,
        image_pages: usize,
    },
    /// PDF to delimited table.
    Table { pages: usize, rows: usize },
    /// PDF to slide deck.
    Slides { slides: usize },
    /// PDF to a single image or an archive of page images.
    Images { pages: usize, archived: bool },
    /// Video to MP3.
    Audio {
        sample_rate: u32,
        channels: usize,
        frames: usize,
        blocks: usize,
    },
}

impl ConversionDetails {
    /// `true` when a word document fell back to embedding every page as an image.
    pub fn used_image_fallback(&self) -> bool {
        matches!(
            self,
            ConversionDetails::Document {
                mode: DocumentMode::Image,
                ..
            }
        )
    }
}

/// The single artifact produced by a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub bytes: Vec<u8>,
    pub suggested_name: String,
    pub kind: OutputKind,
    pub details: Option<ConversionDetails>,
}

impl ConversionResult {
    pub fn new(bytes: Vec<u8>, suggested_name: impl Into<String>, kind: OutputKind) -> Self {
        Self {
            bytes,
            suggested_name: suggested_name.into(),
            kind,
            details: None,
        }
    }

    pub fn with_details(mut self, details: ConversionDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// A serialisable summary without the payload bytes.
    pub fn report(&self) -> ConversionReport {
        ConversionReport {
            suggested_name: self.suggested_name.clone(),
            kind: self.kind,
            mime_type: self.kind.mime_type().to_string(),
            size: self.bytes.len() as u64,
            details: self.details.clone(),
        }
    }
}

/// JSON-friendly view of a [`ConversionResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub suggested_name: String,
    pub kind: OutputKind,
    pub mime_type: String,
    pub size: u64,
    pub details: Option<ConversionDetails>,
}

/// What [`crate::inspect`] reports about a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub name: String,
    pub kind: SourceKind,
    pub size: u64,
    /// Pixel dimensions, for images.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Page count, for PDFs.
    pub pages: Option<usize>,
    /// Per-page classification in page order, for PDFs.
    pub page_kinds: Vec<PageKind>,
    /// The mode a word conversion would use, for PDFs.
    pub mode: Option<DocumentMode>,
}
