//! Configuration types for media conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The numeric constants below (render
//! scales, JPEG qualities, byte ceilings) are product decisions; they are
//! grouped into small policy structs so they can be reviewed and tuned in
//! one place.

use crate::error::ConvertError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bounded search parameters for the size-constrained image compressor.
///
/// Qualities are integer percentages so the search steps exactly
/// 90 → 80 → … without accumulating floating-point drift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionPolicy {
    /// Output byte ceiling. Default: 800 KiB.
    pub target_bytes: u64,
    /// Longest allowed edge in pixels before the first attempt. Default: 2000.
    pub max_dimension: u32,
    /// Hard bound on encode attempts. Default: 10.
    pub max_iterations: u32,
    /// Starting JPEG quality in percent. Default: 90.
    pub initial_quality: u8,
    /// Quality is lowered only while strictly above this. Default: 50.
    pub quality_floor: u8,
    /// Quality decrement per attempt. Default: 10.
    pub quality_step: u8,
    /// Dimension scale applied once the quality floor is reached. Default: 90.
    pub shrink_percent: u8,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            target_bytes: 800 * 1024,
            max_dimension: 2000,
            max_iterations: 10,
            initial_quality: 90,
            quality_floor: 50,
            quality_step: 10,
            shrink_percent: 90,
        }
    }
}

/// Render scale and JPEG quality used by each page-rasterising consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterPolicy {
    /// Slides and the scanned-page fallback in word documents. Default: 1.5.
    pub embed_scale: f32,
    /// Quality for rasters embedded in documents, slides or archives. Default: 0.8.
    pub embed_quality: f32,
    /// A one-page document exported as a standalone image. Default: 2.0.
    pub single_export_scale: f32,
    /// Quality for the standalone single-page export. Default: 0.9.
    pub single_export_quality: f32,
    /// Each page of a multi-page export (packed into an archive). Default: 1.5.
    pub multi_export_scale: f32,
    /// Embedded image width in points per rendered pixel. Default: 0.75.
    pub embed_width_ratio: f32,
}

impl Default for RasterPolicy {
    fn default() -> Self {
        Self {
            embed_scale: 1.5,
            embed_quality: 0.8,
            single_export_scale: 2.0,
            single_export_quality: 0.9,
            multi_export_scale: 1.5,
            embed_width_ratio: 0.75,
        }
    }
}

/// Audio transcoding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPolicy {
    /// Sources larger than this are rejected before decoding. Default: 50 MiB.
    pub max_source_bytes: u64,
    /// MP3 bitrate in kbit/s. Default: 128.
    pub bitrate_kbps: u32,
    /// Samples per channel handed to the encoder per call. Default: 1152.
    pub block_size: usize,
}

impl Default for AudioPolicy {
    fn default() -> Self {
        Self {
            max_source_bytes: 50 * 1024 * 1024,
            bitrate_kbps: 128,
            block_size: 1152,
        }
    }
}

/// Configuration for a single conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_convert::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .target_bytes(500 * 1024)
///     .max_dimension(1600)
///     .build()
///     .unwrap();
/// assert_eq!(config.compression.max_dimension, 1600);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    pub compression: CompressionPolicy,
    pub raster: RasterPolicy,
    pub audio: AudioPolicy,

    /// A page whose trimmed text is longer than this many characters is
    /// treated as native text rather than a scan. Default: 50.
    pub text_threshold: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-unit progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            compression: CompressionPolicy::default(),
            raster: RasterPolicy::default(),
            audio: AudioPolicy::default(),
            text_threshold: 50,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("compression", &self.compression)
            .field("raster", &self.raster)
            .field("audio", &self.audio)
            .field("text_threshold", &self.text_threshold)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.config.fmt(f)
    }
}

impl ConversionConfigBuilder {
    pub fn compression(mut self, policy: CompressionPolicy) -> Self {
        self.config.compression = policy;
        self
    }

    pub fn target_bytes(mut self, bytes: u64) -> Self {
        self.config.compression.target_bytes = bytes;
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.compression.max_dimension = px;
        self
    }

    pub fn raster(mut self, policy: RasterPolicy) -> Self {
        self.config.raster = policy;
        self
    }

    pub fn audio(mut self, policy: AudioPolicy) -> Self {
        self.config.audio = policy;
        self
    }

    pub fn max_audio_source_bytes(mut self, bytes: u64) -> Self {
        self.config.audio.max_source_bytes = bytes;
        self
    }

    pub fn text_threshold(mut self, chars: usize) -> Self {
        self.config.text_threshold = chars;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        let comp = &c.compression;
        if comp.target_bytes == 0 {
            return Err(ConvertError::InvalidConfig(
                "target_bytes must be ≥ 1".into(),
            ));
        }
        if comp.max_dimension == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_dimension must be ≥ 1".into(),
            ));
        }
        if comp.max_iterations == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_iterations must be ≥ 1".into(),
            ));
        }
        if comp.initial_quality == 0 || comp.initial_quality > 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "initial_quality must be 1–100, got {}",
                comp.initial_quality
            )));
        }
        if comp.quality_step == 0 || comp.quality_floor == 0 {
            return Err(ConvertError::InvalidConfig(
                "quality_step and quality_floor must be ≥ 1".into(),
            ));
        }
        if comp.shrink_percent == 0 || comp.shrink_percent >= 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "shrink_percent must be 1–99, got {}",
                comp.shrink_percent
            )));
        }

        let r = &c.raster;
        for (name, q) in [
            ("embed_quality", r.embed_quality),
            ("single_export_quality", r.single_export_quality),
        ] {
            if !(q > 0.0 && q <= 1.0) {
                return Err(ConvertError::InvalidConfig(format!(
                    "{name} must be in (0, 1], got {q}"
                )));
            }
        }
        for (name, s) in [
            ("embed_scale", r.embed_scale),
            ("single_export_scale", r.single_export_scale),
            ("multi_export_scale", r.multi_export_scale),
            ("embed_width_ratio", r.embed_width_ratio),
        ] {
            if !(s > 0.0 && s.is_finite()) {
                return Err(ConvertError::InvalidConfig(format!(
                    "{name} must be > 0, got {s}"
                )));
            }
        }

        if c.audio.block_size == 0 {
            return Err(ConvertError::InvalidConfig(
                "audio block_size must be ≥ 1".into(),
            ));
        }
        if c.audio.bitrate_kbps == 0 {
            return Err(ConvertError::InvalidConfig(
                "audio bitrate must be ≥ 1 kbps".into(),
            ));
        }
        Ok(self.config)
    }
}
