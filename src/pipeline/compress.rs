//! Size-constrained image compression.
//!
//! ## Search
//!
//! 1. Fit the image inside `max_dimension` × `max_dimension`, keeping the
//!    aspect ratio (never upscaling).
//! 2. Encode as JPEG at `initial_quality`.
//! 3. While the result exceeds `target_bytes`: lower quality by
//!    `quality_step` if it is still above `quality_floor`, otherwise shrink
//!    both dimensions to `shrink_percent` of their current value.
//! 4. Stop at the first fit or after `max_iterations` attempts, returning
//!    the last encoding either way.
//!
//! Every attempt redraws from the original bitmap, so repeated shrinking
//! never compounds resampling blur.

use crate::backend::{ImageKind, RasterCodec};
use crate::config::CompressionPolicy;
use crate::error::{ConvertError, Stage};
use crate::progress::{Progress, ProgressUnit};
use image::imageops::FilterType;
use image::DynamicImage;
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Scale `(width, height)` so the longer edge is at most `max`.
///
/// The longer edge lands exactly on `max`; the shorter edge is floored.
/// Neither edge drops below 1 px.
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let (w, h, m) = (u64::from(width), u64::from(height), u64::from(max));
    let (w, h) = if w >= h {
        (m, h * m / w)
    } else {
        (w * m / h, m)
    };
    (w.max(1) as u32, h.max(1) as u32)
}

/// One step of the search state. Quality is in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionJob {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    /// Attempts made so far.
    pub attempts: u32,
}

impl CompressionJob {
    /// Initial state for an image of `width` × `height`.
    pub fn new(width: u32, height: u32, policy: &CompressionPolicy) -> Self {
        let (width, height) = fit_within(width, height, policy.max_dimension);
        Self {
            width,
            height,
            quality: policy.initial_quality,
            attempts: 0,
        }
    }

    /// Advance after an attempt overshot the target.
    pub fn step(&mut self, policy: &CompressionPolicy) {
        if self.quality > policy.quality_floor {
            self.quality = self
                .quality
                .saturating_sub(policy.quality_step)
                .max(policy.quality_floor);
        } else {
            self.width = shrink(self.width, policy.shrink_percent);
            self.height = shrink(self.height, policy.shrink_percent);
        }
    }
}

fn shrink(px: u32, percent: u8) -> u32 {
    ((u64::from(px) * u64::from(percent)) / 100).max(1) as u32
}

/// Result of the search.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub attempts: u32,
    /// `false` when the attempt bound was reached above the target size.
    pub target_met: bool,
}

/// Run the bounded search over `image`.
pub fn compress_to_target(
    image: &DynamicImage,
    policy: &CompressionPolicy,
    codec: &dyn RasterCodec,
    progress: Progress<'_>,
) -> Result<CompressedImage, ConvertError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ConvertError::corrupt(Stage::Open, "image has no pixels"));
    }
    let max = policy.max_iterations as usize;
    let mut job = CompressionJob::new(image.width(), image.height(), policy);
    debug!(
        "Compressing {}×{} → {}×{} start, target {} bytes",
        image.width(),
        image.height(),
        job.width,
        job.height,
        policy.target_bytes
    );
    progress.start(ProgressUnit::Attempt, max);

    loop {
        job.attempts += 1;
        let n = job.attempts as usize;
        progress.unit_start(n, max);

        let canvas = draw(image, job.width, job.height);
        let bytes = match codec.encode(&canvas, ImageKind::Jpeg, f32::from(job.quality) / 100.0) {
            Ok(bytes) => bytes,
            Err(e) => {
                progress.unit_error(n, max, &e);
                return Err(e.at_stage(Stage::Compress));
            }
        };
        drop(canvas);
        progress.unit_complete(n, max, bytes.len());

        let size = bytes.len() as u64;
        debug!(
            "Attempt {}: {}×{} q{} → {} bytes",
            job.attempts, job.width, job.height, job.quality, size
        );

        let target_met = size <= policy.target_bytes;
        if target_met || job.attempts >= policy.max_iterations {
            if target_met {
                info!(
                    "Compressed to {} bytes in {} attempt(s) ({}×{}, q{})",
                    size, job.attempts, job.width, job.height, job.quality
                );
            } else {
                warn!(
                    "Attempt bound reached at {} bytes, above the {}-byte target",
                    size, policy.target_bytes
                );
            }
            progress.complete(job.attempts as usize, bytes.len());
            return Ok(CompressedImage {
                bytes,
                width: job.width,
                height: job.height,
                quality: job.quality,
                attempts: job.attempts,
                target_met,
            });
        }

        job.step(policy);
    }
}

/// Resample the original to `width` × `height`. Alpha is left for the
/// codec to flatten.
fn draw(image: &DynamicImage, width: u32, height: u32) -> Cow<'_, DynamicImage> {
    if (width, height) == (image.width(), image.height()) {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(image.resize_exact(width, height, FilterType::Triangle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::raster::ImageCodec;
    use image::{Rgba, RgbaImage};
    use std::sync::Mutex;

    /// Produces `width * height * quality / divisor` bytes and records each call.
    struct SizedCodec {
        divisor: u64,
        calls: Mutex<Vec<(u32, u32, u8)>>,
    }

    impl SizedCodec {
        fn new(divisor: u64) -> Self {
            Self {
                divisor,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(u32, u32, u8)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RasterCodec for SizedCodec {
        fn decode(&self, _bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
            unreachable!()
        }

        fn encode(
            &self,
            image: &DynamicImage,
            _kind: ImageKind,
            quality: f32,
        ) -> Result<Vec<u8>, ConvertError> {
            let q = (quality * 100.0).round() as u8;
            self.calls.lock().unwrap().push((image.width(), image.height(), q));
            let len = u64::from(image.width()) * u64::from(image.height()) * u64::from(q)
                / self.divisor;
            Ok(vec![0u8; len.max(1) as usize])
        }
    }

    fn policy(target: u64, max_dimension: u32) -> CompressionPolicy {
        CompressionPolicy {
            target_bytes: target,
            max_dimension,
            ..CompressionPolicy::default()
        }
    }

    fn blank(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([200, 10, 10, 255])))
    }

    #[test]
    fn fit_within_caps_longer_edge() {
        assert_eq!(fit_within(4000, 3000, 2000), (2000, 1500));
        assert_eq!(fit_within(3000, 7000, 2000), (857, 2000));
        assert_eq!(fit_within(1200, 800, 2000), (1200, 800));
        assert_eq!(fit_within(100_000, 10, 2000), (2000, 1));
    }

    #[test]
    fn quality_steps_down_then_dimensions_shrink() {
        let p = CompressionPolicy::default();
        let mut job = CompressionJob::new(1000, 500, &p);
        let mut seen = vec![(job.width, job.quality)];
        for _ in 0..6 {
            job.step(&p);
            seen.push((job.width, job.quality));
        }
        assert_eq!(
            seen,
            vec![
                (1000, 90),
                (1000, 80),
                (1000, 70),
                (1000, 60),
                (1000, 50),
                (900, 50),
                (810, 50),
            ]
        );
    }

    #[test]
    fn stops_at_first_fit() {
        let codec = SizedCodec::new(1);
        let img = blank(10, 10);
        let out = compress_to_target(&img, &policy(1_000_000, 2000), &codec, Progress::none())
            .unwrap();
        assert!(out.target_met);
        assert_eq!(out.attempts, 1);
        assert_eq!(out.quality, 90);
        assert_eq!(codec.calls(), vec![(10, 10, 90)]);
    }

    #[test]
    fn never_exceeds_attempt_bound() {
        let codec = SizedCodec::new(1);
        let img = blank(100, 100);
        let out = compress_to_target(&img, &policy(1, 2000), &codec, Progress::none()).unwrap();
        assert!(!out.target_met);
        assert_eq!(out.attempts, 10);
        let calls = codec.calls();
        assert_eq!(calls.len(), 10);
        // Five quality steps, then five shrinks at the floor.
        assert_eq!(calls[4], (100, 100, 50));
        assert_eq!(calls[5], (90, 90, 50));
        assert_eq!(calls[8], (64, 64, 50));
        assert_eq!(calls[9], (57, 57, 50));
        assert_eq!((out.width, out.height), (57, 57));
    }

    #[test]
    fn prescales_oversized_input_before_first_attempt() {
        let codec = SizedCodec::new(1);
        let img = blank(400, 100);
        compress_to_target(&img, &policy(u64::MAX, 200), &codec, Progress::none()).unwrap();
        assert_eq!(codec.calls()[0], (200, 50, 90));
    }

    /// Records whether each bitmap reached the codec with its alpha channel.
    struct AlphaRecorder {
        alpha: Mutex<Vec<bool>>,
    }

    impl RasterCodec for AlphaRecorder {
        fn decode(&self, _bytes: &[u8]) -> Result<DynamicImage, ConvertError> {
            unreachable!("compressor never decodes")
        }

        fn encode(
            &self,
            image: &DynamicImage,
            _kind: ImageKind,
            _quality: f32,
        ) -> Result<Vec<u8>, ConvertError> {
            self.alpha.lock().unwrap().push(image.color().has_alpha());
            Ok(vec![0; 10])
        }
    }

    #[test]
    fn bitmap_reaches_codec_unflattened() {
        let codec = AlphaRecorder {
            alpha: Mutex::new(Vec::new()),
        };
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(300, 300, Rgba([0, 0, 0, 0])));
        compress_to_target(&img, &policy(u64::MAX, 200), &codec, Progress::none()).unwrap();
        assert_eq!(*codec.alpha.lock().unwrap(), vec![true]);
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 0])));
        let out = compress_to_target(
            &img,
            &CompressionPolicy::default(),
            &ImageCodec,
            Progress::none(),
        )
        .unwrap();
        let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
        let px = decoded.get_pixel(4, 4);
        assert!(px.0.iter().all(|&c| c > 240), "expected white, got {px:?}");
    }
}
