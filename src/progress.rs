//! Progress-callback trait for per-unit conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as a pipeline works through its units: pages for PDF conversions,
//! encode attempts for the image compressor, PCM blocks for audio.
//!
//! # Example
//!
//! ```rust
//! use edgequake_convert::{ConversionProgressCallback, ConversionConfig, ProgressUnit};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, n: usize, total: usize, bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{n}/{total} done ({bytes} bytes)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a pipeline counts as one unit of progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressUnit {
    /// One document page.
    Page,
    /// One encode attempt of the size-constrained compressor.
    Attempt,
    /// One block of PCM samples handed to the audio encoder.
    Block,
}

/// Called by the conversion pipeline as it processes each unit.
///
/// Pipelines run strictly sequentially, so events for one conversion never
/// arrive concurrently; the `Send + Sync` bound exists because the pipeline
/// itself runs on a blocking worker thread. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, as soon as the number of units is known.
    ///
    /// For the compressor `total` is the attempt bound; the search may
    /// finish in fewer.
    fn on_conversion_start(&self, unit: ProgressUnit, total: usize) {
        let _ = (unit, total);
    }

    /// Called before unit `n` (1-indexed) is processed.
    fn on_unit_start(&self, n: usize, total: usize) {
        let _ = (n, total);
    }

    /// Called after unit `n` produced `bytes` bytes of output.
    fn on_unit_complete(&self, n: usize, total: usize, bytes: usize) {
        let _ = (n, total, bytes);
    }

    /// Called when unit `n` fails; the conversion aborts right after.
    fn on_unit_error(&self, n: usize, total: usize, error: &str) {
        let _ = (n, total, error);
    }

    /// Called once after the artifact has been assembled.
    fn on_conversion_complete(&self, units: usize, output_bytes: usize) {
        let _ = (units, output_bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Emits events to an optional callback; every method is a no-op without one.
#[derive(Clone, Copy)]
pub struct Progress<'a> {
    cb: Option<&'a dyn ConversionProgressCallback>,
}

impl<'a> Progress<'a> {
    pub fn new(cb: Option<&'a ProgressCallback>) -> Self {
        Self {
            cb: cb.map(|c| c.as_ref()),
        }
    }

    pub fn none() -> Self {
        Self { cb: None }
    }

    pub fn start(&self, unit: ProgressUnit, total: usize) {
        if let Some(cb) = self.cb {
            cb.on_conversion_start(unit, total);
        }
    }

    pub fn unit_start(&self, n: usize, total: usize) {
        if let Some(cb) = self.cb {
            cb.on_unit_start(n, total);
        }
    }

    pub fn unit_complete(&self, n: usize, total: usize, bytes: usize) {
        if let Some(cb) = self.cb {
            cb.on_unit_complete(n, total, bytes);
        }
    }

    pub fn unit_error(&self, n: usize, total: usize, error: &dyn std::fmt::Display) {
        if let Some(cb) = self.cb {
            cb.on_unit_error(n, total, &error.to_string());
        }
    }

    pub fn complete(&self, units: usize, output_bytes: usize) {
        if let Some(cb) = self.cb {
            cb.on_conversion_complete(units, output_bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        output_bytes: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, _unit: ProgressUnit, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_unit_start(&self, _n: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_complete(&self, _n: usize, _total: usize, _bytes: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_error(&self, _n: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _units: usize, output_bytes: usize) {
            self.output_bytes.store(output_bytes, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(ProgressUnit::Page, 5);
        cb.on_unit_start(1, 5);
        cb.on_unit_complete(1, 5, 42);
        cb.on_unit_error(2, 5, "some error");
        cb.on_conversion_complete(5, 4096);
    }

    #[test]
    fn progress_forwards_to_callback() {
        let tracker = Arc::new(TrackingCallback::default());
        let cb: ProgressCallback = tracker.clone();
        let progress = Progress::new(Some(&cb));

        progress.start(ProgressUnit::Page, 3);
        progress.unit_start(1, 3);
        progress.unit_complete(1, 3, 100);
        progress.unit_start(2, 3);
        progress.unit_error(2, 3, &"render failed");
        progress.complete(1, 100);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.output_bytes.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn progress_without_callback_is_silent() {
        let progress = Progress::none();
        progress.start(ProgressUnit::Block, 10);
        progress.unit_complete(1, 10, 0);
        progress.complete(10, 0);
    }
}
