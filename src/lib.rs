//! # edgequake-convert
//!
//! Convert images, PDFs and videos into compressed images, word documents,
//! CSV tables, slide decks, page images and MP3 audio.
//!
//! ## Pipeline Overview
//!
//! ```text
//! source file
//!  │
//!  ├─ 1. Resolve   read bytes, sniff kind (image | pdf | video)
//!  ├─ 2. Open      decode the image, open the PDF, or demux the video
//!  ├─ 3. Process   one pipeline per ConversionKind (spawn_blocking)
//!  │                 compress · word · table · slides · images · audio
//!  └─ 4. Output    one artifact: bytes + suggested name + kind tag
//! ```
//!
//! Every conversion is all-or-nothing. A run either returns exactly one
//! [`ConversionResult`] or a [`ConvertError`] naming the failing stage.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_convert::{convert, ConversionConfig, ConversionKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let result = convert("scan.pdf", ConversionKind::PdfToWord, &config).await?;
//!     std::fs::write(&result.suggested_name, &result.bytes)?;
//!     if result.details.as_ref().is_some_and(|d| d.used_image_fallback()) {
//!         eprintln!("no text layer found; pages were embedded as images");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Testing with fakes
//!
//! Pipelines never call a codec library directly. [`convert_asset`] takes a
//! [`Capabilities`] bundle of trait objects; pass
//! [`Capabilities::native()`] in production or in-memory fakes in tests.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `edgeconv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-convert = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime Requirements
//!
//! PDF conversions need a pdfium shared library. Set `PDFIUM_LIB_PATH` to
//! the library file or its directory, or install it where the system loader
//! finds it. Image and audio conversions do not need pdfium.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::Capabilities;
pub use config::{
    AudioPolicy, CompressionPolicy, ConversionConfig, ConversionConfigBuilder, RasterPolicy,
};
pub use convert::{
    convert, convert_asset, convert_from_bytes, convert_sync, convert_to_file, inspect,
    summarize_asset, write_output, ConversionKind,
};
pub use error::{ConvertError, Stage};
pub use output::{ConversionDetails, ConversionReport, ConversionResult, OutputKind, SourceSummary};
pub use pipeline::classify::{DocumentMode, PageKind};
pub use progress::{
    ConversionProgressCallback, NoopProgressCallback, ProgressCallback, ProgressUnit,
};
pub use source::{SourceAsset, SourceKind};
