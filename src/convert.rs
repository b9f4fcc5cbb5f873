//! Conversion entry points.
//!
//! [`convert_asset`] is the synchronous core: it picks one pipeline for the
//! requested [`ConversionKind`], runs it against a [`Capabilities`] bundle
//! and returns exactly one [`ConversionResult`] or an error.
//!
//! The async functions do their file I/O with `tokio::fs` and then run the
//! whole pipeline on a single `spawn_blocking` thread. pdfium keeps
//! thread-local state and every pipeline is CPU-bound, so nothing inside a
//! conversion ever awaits.

use crate::backend::{Capabilities, PagedDocument};
use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::output::{ConversionDetails, ConversionReport, ConversionResult, OutputKind, SourceSummary};
use crate::pipeline::audio::{encode_mp3, ensure_within_ceiling};
use crate::pipeline::classify::{classify_page, document_mode};
use crate::pipeline::compress::compress_to_target;
use crate::pipeline::pack::{export_pages, PackedImages};
use crate::pipeline::slides::build_deck;
use crate::pipeline::table::build_table;
use crate::pipeline::word::build_document;
use crate::progress::Progress;
use crate::source::{self, SourceAsset, SourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// The six supported conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionKind {
    /// Image → JPEG under a byte budget.
    ImageCompress,
    /// PDF → word-processor document.
    PdfToWord,
    /// PDF → CSV table.
    PdfToTable,
    /// PDF → slide deck.
    PdfToSlides,
    /// PDF → one JPEG, or a ZIP of JPEGs.
    PdfToImages,
    /// Video → MP3.
    VideoToAudio,
}

impl ConversionKind {
    pub const ALL: [ConversionKind; 6] = [
        ConversionKind::ImageCompress,
        ConversionKind::PdfToWord,
        ConversionKind::PdfToTable,
        ConversionKind::PdfToSlides,
        ConversionKind::PdfToImages,
        ConversionKind::VideoToAudio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ConversionKind::ImageCompress => "image-compress",
            ConversionKind::PdfToWord => "pdf-to-word",
            ConversionKind::PdfToTable => "pdf-to-table",
            ConversionKind::PdfToSlides => "pdf-to-slides",
            ConversionKind::PdfToImages => "pdf-to-images",
            ConversionKind::VideoToAudio => "video-to-audio",
        }
    }

    /// The only source kind this conversion accepts.
    pub fn expected_source(self) -> SourceKind {
        match self {
            ConversionKind::ImageCompress => SourceKind::Image,
            ConversionKind::VideoToAudio => SourceKind::Video,
            _ => SourceKind::Pdf,
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Synchronous core ─────────────────────────────────────────────────────────

/// Run one conversion of an in-memory source.
///
/// # Errors
/// Any failure aborts the run; no partial artifact is returned.
pub fn convert_asset(
    asset: &SourceAsset,
    kind: ConversionKind,
    config: &ConversionConfig,
    caps: &Capabilities,
) -> Result<ConversionResult, ConvertError> {
    let expected = kind.expected_source();
    if asset.kind() != expected {
        return Err(ConvertError::SourceKindMismatch {
            kind,
            expected,
            found: asset.kind(),
        });
    }

    let start = Instant::now();
    info!("Starting {} of '{}' ({} bytes)", kind, asset.name(), asset.len());
    let progress = Progress::new(config.progress_callback.as_ref());
    let stem = asset.stem();

    let result = match kind {
        ConversionKind::ImageCompress => {
            let image = caps.raster.decode(asset.bytes())?;
            let out = compress_to_target(&image, &config.compression, caps.raster.as_ref(), progress)?;
            drop(image);
            ConversionResult::new(out.bytes, format!("compressed_{stem}.jpg"), OutputKind::Jpg)
                .with_details(ConversionDetails::Compression {
                    original_bytes: asset.len(),
                    width: out.width,
                    height: out.height,
                    quality: out.quality,
                    attempts: out.attempts,
                    target_met: out.target_met,
                })
        }
        ConversionKind::PdfToWord => with_document(asset, config, caps, |doc| {
            let out = build_document(
                doc,
                config.text_threshold,
                &config.raster,
                caps.raster.as_ref(),
                progress,
            )?;
            Ok(
                ConversionResult::new(out.bytes, format!("{stem}.doc"), OutputKind::Doc)
                    .with_details(ConversionDetails::Document {
                        pages: out.pages,
                        mode: out.mode,
                        text_pages: out.text_pages,
                        image_pages: out.image_pages,
                    }),
            )
        })?,
        ConversionKind::PdfToTable => with_document(asset, config, caps, |doc| {
            let table = build_table(doc, progress)?;
            Ok(
                ConversionResult::new(table.csv.into_bytes(), format!("{stem}.csv"), OutputKind::Csv)
                    .with_details(ConversionDetails::Table {
                        pages: table.pages,
                        rows: table.rows,
                    }),
            )
        })?,
        ConversionKind::PdfToSlides => with_document(asset, config, caps, |doc| {
            let deck = build_deck(
                doc,
                stem,
                &config.raster,
                caps.raster.as_ref(),
                caps.archive.as_ref(),
                progress,
            )?;
            Ok(
                ConversionResult::new(deck.bytes, format!("{stem}.pptx"), OutputKind::Pptx)
                    .with_details(ConversionDetails::Slides {
                        slides: deck.slides,
                    }),
            )
        })?,
        ConversionKind::PdfToImages => with_document(asset, config, caps, |doc| {
            let packed = export_pages(
                doc,
                &config.raster,
                caps.raster.as_ref(),
                caps.archive.as_ref(),
                progress,
            )?;
            let pages = packed.pages();
            let (name, kind, archived) = match &packed {
                PackedImages::Direct(_) => (format!("{stem}.jpg"), OutputKind::Jpg, false),
                PackedImages::Archive { .. } => {
                    (format!("{stem}_images.zip"), OutputKind::Zip, true)
                }
            };
            Ok(ConversionResult::new(packed.into_bytes(), name, kind)
                .with_details(ConversionDetails::Images { pages, archived }))
        })?,
        ConversionKind::VideoToAudio => {
            ensure_within_ceiling(asset.len(), config.audio.max_source_bytes)?;
            let hint = extension(asset.name());
            let audio = caps.audio.decode(asset.bytes(), hint.as_deref())?;
            let out = encode_mp3(&audio, &config.audio, caps.mp3.as_ref(), progress)?;
            ConversionResult::new(out.bytes, format!("{stem}.mp3"), OutputKind::Mp3).with_details(
                ConversionDetails::Audio {
                    sample_rate: audio.sample_rate,
                    channels: out.channels,
                    frames: audio.frames(),
                    blocks: out.blocks,
                },
            )
        }
    };

    info!(
        "{} complete: '{}' {} bytes in {}ms",
        kind,
        result.suggested_name,
        result.bytes.len(),
        start.elapsed().as_millis()
    );
    Ok(result)
}

/// Open the asset as a paged document and hand it to `f`.
fn with_document<T>(
    asset: &SourceAsset,
    config: &ConversionConfig,
    caps: &Capabilities,
    f: impl FnOnce(&dyn PagedDocument) -> Result<T, ConvertError>,
) -> Result<T, ConvertError> {
    let doc = caps.pages.open(asset.bytes(), config.password.as_deref())?;
    info!("Opened '{}': {} pages", asset.name(), doc.page_count());
    f(doc.as_ref())
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Describe a source without converting it.
pub fn summarize_asset(
    asset: &SourceAsset,
    config: &ConversionConfig,
    caps: &Capabilities,
) -> Result<SourceSummary, ConvertError> {
    let mut summary = SourceSummary {
        name: asset.name().to_string(),
        kind: asset.kind(),
        size: asset.len(),
        width: None,
        height: None,
        pages: None,
        page_kinds: Vec::new(),
        mode: None,
    };
    match asset.kind() {
        SourceKind::Image => {
            let image = caps.raster.decode(asset.bytes())?;
            summary.width = Some(image.width());
            summary.height = Some(image.height());
        }
        SourceKind::Pdf => {
            let doc = caps.pages.open(asset.bytes(), config.password.as_deref())?;
            let total = doc.page_count();
            for number in 1..=total {
                let page = classify_page(doc.as_ref(), number, config.text_threshold)?;
                summary.page_kinds.push(page.kind());
            }
            summary.pages = Some(total);
            summary.mode = Some(document_mode(summary.page_kinds.iter().copied()));
        }
        SourceKind::Video => {}
    }
    Ok(summary)
}

// ── Async entry points ───────────────────────────────────────────────────────

/// Convert the file at `input`.
///
/// For video sources the size ceiling is checked against file metadata
/// before any byte is read.
///
/// # Errors
/// Returns `Err(ConvertError)` for every failure; see [`ConvertError`].
pub async fn convert(
    input: impl AsRef<Path>,
    kind: ConversionKind,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConvertError> {
    let path = input.as_ref();
    let size = source::file_size(path).await?;
    debug!("Source '{}' is {} bytes", path.display(), size);
    if kind == ConversionKind::VideoToAudio {
        ensure_within_ceiling(size, config.audio.max_source_bytes)?;
    }
    let asset = source::read_source(path).await?;
    run_blocking(asset, kind, config).await
}

/// Convert in-memory bytes. `name` supplies the suggested output stem and
/// an extension hint for kind detection.
///
/// # Example
/// ```rust,no_run
/// use edgequake_convert::{convert_from_bytes, ConversionConfig, ConversionKind};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("report.pdf")?;
/// let config = ConversionConfig::default();
/// let result = convert_from_bytes("report.pdf", bytes, ConversionKind::PdfToTable, &config).await?;
/// assert_eq!(result.suggested_name, "report.csv");
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    kind: ConversionKind,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConvertError> {
    if kind == ConversionKind::VideoToAudio {
        ensure_within_ceiling(bytes.len() as u64, config.audio.max_source_bytes)?;
    }
    let asset = SourceAsset::from_bytes(name, bytes)?;
    run_blocking(asset, kind, config).await
}

async fn run_blocking(
    asset: SourceAsset,
    kind: ConversionKind,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConvertError> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || {
        convert_asset(&asset, kind, &config, &Capabilities::native())
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {e}")))?
}

/// Convert and write the artifact to `output_path`.
///
/// The file is written to a temp file in the target directory and then
/// renamed into place, so a failed run leaves nothing behind.
pub async fn convert_to_file(
    input: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    kind: ConversionKind,
    config: &ConversionConfig,
) -> Result<ConversionReport, ConvertError> {
    let result = convert(input, kind, config).await?;
    let report = result.report();
    write_output(output_path.as_ref(), result.bytes).await?;
    Ok(report)
}

/// Atomically write `bytes` to `path`, creating parent directories.
pub async fn write_output(path: &Path, bytes: Vec<u8>) -> Result<(), ConvertError> {
    let fail = |source: std::io::Error| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir: PathBuf = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await.map_err(fail)?;

    let target = path.to_path_buf();
    let len = bytes.len();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Write task panicked: {e}")))?
    .map_err(fail)?;

    info!("Wrote {} bytes to '{}'", len, path.display());
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    kind: ConversionKind,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, kind, config))
}

/// Inspect a source file without converting it.
///
/// PDFs are opened and every page classified; images are decoded for
/// their dimensions; videos report only their size.
pub async fn inspect(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<SourceSummary, ConvertError> {
    let asset = source::read_source(input.as_ref()).await?;
    let config = config.clone();
    tokio::task::spawn_blocking(move || summarize_asset(&asset, &config, &Capabilities::native()))
        .await
        .map_err(|e| ConvertError::Internal(format!("Inspect task panicked: {e}")))?
}
