//! Pipeline stages for media conversion.
//!
//! Each submodule implements exactly one transformation and talks to the
//! outside world only through the capability traits in [`crate::backend`].
//!
//! ## Data Flow
//!
//! ```text
//! image ──▶ compress ─────────────────────────────▶ jpg
//! pdf ──┬─▶ classify ──▶ render? ──▶ word ────────▶ doc
//!       ├─▶ table ────────────────────────────────▶ csv
//!       ├─▶ render ──▶ slides ────────────────────▶ pptx
//!       └─▶ render ──▶ pack ──────────────────────▶ jpg | zip
//! video ──▶ (decode) ──▶ audio ───────────────────▶ mp3
//! ```
//!
//! 1. [`compress`]: bounded quality/dimension search for a byte budget
//! 2. [`classify`]: native text vs scanned page, and the document mode
//! 3. [`table`]: baseline-bucketed rows as CSV
//! 4. [`render`]: rasterise one page and JPEG-encode it
//! 5. [`word`]: page-ordered word-processor markup
//! 6. [`slides`]: one full-bleed image per slide
//! 7. [`pack`]: direct image for one page, archive for several
//! 8. [`audio`]: float PCM to 16-bit blocks, MP3 bitstream
//!
//! Pages, attempts and blocks are always processed in order, one at a time,
//! so at most one rendered bitmap is alive at any moment.

pub mod audio;
pub mod classify;
pub mod compress;
pub mod pack;
pub mod render;
pub mod slides;
pub mod table;
pub mod word;
