//! Source resolution: turn a user-supplied path into an immutable [`SourceAsset`].
//!
//! The declared kind is sniffed from magic bytes first and the file
//! extension second, so a `.bin` PDF still opens as a PDF and an MP4 whose
//! `ftyp` box was stripped still routes to the audio pipeline.

use crate::error::{ConvertError, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Broad category of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Image,
    Pdf,
    Video,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Image => "image",
            SourceKind::Pdf => "pdf",
            SourceKind::Video => "video",
        })
    }
}

impl SourceKind {
    /// Detect the kind from leading bytes, falling back to the file extension.
    pub fn detect(bytes: &[u8], name: &str) -> Option<Self> {
        Self::from_magic(bytes).or_else(|| Self::from_extension(name))
    }

    fn from_magic(bytes: &[u8]) -> Option<Self> {
        const IMAGE_MAGIC: &[&[u8]] = &[
            b"\xFF\xD8\xFF",       // JPEG
            b"\x89PNG\r\n\x1a\n",  // PNG
            b"GIF87a",
            b"GIF89a",
            b"BM",
        ];

        if bytes.starts_with(b"%PDF") {
            return Some(SourceKind::Pdf);
        }
        if IMAGE_MAGIC.iter().any(|m| bytes.starts_with(m)) {
            return Some(SourceKind::Image);
        }
        if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(SourceKind::Image);
        }
        // ISO-BMFF carries `ftyp` at offset 4 and the major brand after it.
        // HEIF and AVIF stills share the box layout with mp4/mov/m4v.
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            const STILL_BRANDS: &[&[u8]] = &[
                b"heic", b"heix", b"heim", b"heis", b"hevc", b"hevx", b"mif1", b"msf1",
                b"avif", b"avis",
            ];
            let brand = &bytes[8..12];
            return if STILL_BRANDS.contains(&brand) {
                Some(SourceKind::Image)
            } else {
                Some(SourceKind::Video)
            };
        }
        // WebM/MKV is EBML.
        if bytes.starts_with(b"\x1A\x45\xDF\xA3") {
            return Some(SourceKind::Video);
        }
        None
    }

    fn from_extension(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp" => Some(SourceKind::Image),
            "mp4" | "m4v" | "mov" | "webm" | "mkv" => Some(SourceKind::Video),
            _ => None,
        }
    }
}

/// Raw source bytes plus their declared kind. Immutable once read.
#[derive(Debug, Clone)]
pub struct SourceAsset {
    name: String,
    kind: SourceKind,
    bytes: Vec<u8>,
}

impl SourceAsset {
    /// Wrap in-memory bytes. The kind is given explicitly by the caller.
    pub fn new(name: impl Into<String>, kind: SourceKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes,
        }
    }

    /// Wrap in-memory bytes, sniffing the kind.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ConvertError> {
        let name = name.into();
        let kind = SourceKind::detect(&bytes, &name).ok_or_else(|| {
            ConvertError::corrupt(Stage::Read, format!("'{name}' is not a recognised image, PDF or video"))
        })?;
        Ok(Self::new(name, kind, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name without directory or final extension.
    pub fn stem(&self) -> &str {
        file_stem(&self.name)
    }
}

/// `"report.final.pdf"` → `"report.final"`; `"archive"` → `"archive"`.
pub fn file_stem(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(i) => &base[..i],
    }
}

/// Validate that `path` exists and is readable, returning its size in bytes.
///
/// Used as a pre-flight check so size ceilings can reject a file before
/// any of it is read into memory.
pub async fn file_size(path: &Path) -> Result<u64, ConvertError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(ConvertError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(map_io(path, e)),
    }
}

/// Read the file at `path` into a [`SourceAsset`].
pub async fn read_source(path: &Path) -> Result<SourceAsset, ConvertError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| map_io(path, e))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let asset = SourceAsset::from_bytes(name, bytes)?;
    debug!(
        "Resolved {} source '{}' ({} bytes)",
        asset.kind(),
        path.display(),
        asset.len()
    );
    Ok(asset)
}

fn map_io(path: &Path, e: std::io::Error) -> ConvertError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied { path },
        std::io::ErrorKind::NotFound => ConvertError::FileNotFound { path },
        _ => ConvertError::corrupt(Stage::Read, format!("{}: {e}", path.display())),
    }
}
