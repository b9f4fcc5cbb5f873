//! Error types for the edgequake-convert library.
//!
//! Every conversion is all-or-nothing: [`ConvertError`] is returned from the
//! top-level `convert*` functions and no partial artifact is ever exposed.
//! Each variant reports the pipeline [`Stage`] it came from so callers can
//! tell an unreadable PDF apart from a codec that produced no output.

use crate::convert::ConversionKind;
use crate::source::SourceKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The pipeline stage a failure originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Reading the source file from disk.
    Read,
    /// Opening or decoding the source container.
    Open,
    /// Extracting page text for classification or table reconstruction.
    Classify,
    /// The size-constrained compression search.
    Compress,
    /// Rasterising a page.
    Render,
    /// Encoding a raster or audio block.
    Encode,
    /// Bundling outputs into an archive or slide deck.
    Pack,
    /// Writing the finished artifact.
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Read => "read",
            Stage::Open => "open",
            Stage::Classify => "classify",
            Stage::Compress => "compress",
            Stage::Render => "render",
            Stage::Encode => "encode",
            Stage::Pack => "pack",
            Stage::Write => "write",
        };
        f.write_str(s)
    }
}

/// All fatal errors returned by the edgequake-convert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The selected conversion cannot consume this kind of source.
    #[error("{kind} conversion needs a {expected} source, got {found}")]
    SourceKindMismatch {
        kind: ConversionKind,
        expected: SourceKind,
        found: SourceKind,
    },

    /// Input exceeds a configured size ceiling; rejected before decoding.
    #[error("Source is {size} bytes, above the {limit}-byte limit for this conversion")]
    ResourceCeilingExceeded { size: u64, limit: u64 },

    // ── Source errors ─────────────────────────────────────────────────────
    /// The document or media container failed to open or decode.
    #[error("[{stage}] unsupported or corrupt source: {detail}")]
    UnsupportedOrCorruptSource { stage: Stage, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    // ── Render / encode errors ────────────────────────────────────────────
    /// The rendering surface (pdfium) could not be acquired.
    #[error(
        "Rendering engine unavailable: {detail}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy,\n\
or install pdfium where the system loader can find it.\n"
    )]
    RenderUnavailable { detail: String },

    /// A codec primitive failed or produced no output for a required block.
    #[error("[{stage}] encode failed: {detail}")]
    EncodeFailure { stage: Stage, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// The stage that failed, for reporting.
    pub fn stage(&self) -> Stage {
        match self {
            ConvertError::FileNotFound { .. }
            | ConvertError::PermissionDenied { .. }
            | ConvertError::SourceKindMismatch { .. }
            | ConvertError::ResourceCeilingExceeded { .. }
            | ConvertError::InvalidConfig(_)
            | ConvertError::Internal(_) => Stage::Read,
            ConvertError::UnsupportedOrCorruptSource { stage, .. } => *stage,
            ConvertError::PasswordRequired | ConvertError::WrongPassword => Stage::Open,
            ConvertError::RenderUnavailable { .. } => Stage::Render,
            ConvertError::EncodeFailure { stage, .. } => *stage,
            ConvertError::OutputWriteFailed { .. } => Stage::Write,
        }
    }

    pub(crate) fn corrupt(stage: Stage, detail: impl Into<String>) -> Self {
        ConvertError::UnsupportedOrCorruptSource {
            stage,
            detail: detail.into(),
        }
    }

    pub(crate) fn encode(stage: Stage, detail: impl Into<String>) -> Self {
        ConvertError::EncodeFailure {
            stage,
            detail: detail.into(),
        }
    }

    /// Re-attribute a codec failure to the stage that invoked the codec.
    pub(crate) fn at_stage(self, stage: Stage) -> Self {
        match self {
            ConvertError::EncodeFailure { detail, .. } => ConvertError::EncodeFailure { stage, detail },
            ConvertError::UnsupportedOrCorruptSource { detail, .. } => {
                ConvertError::UnsupportedOrCorruptSource { stage, detail }
            }
            other => other,
        }
    }
}
