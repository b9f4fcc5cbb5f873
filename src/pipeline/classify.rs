//! Page classification: native text or scanned raster.
//!
//! A page whose joined text runs are longer than the threshold (after
//! trimming) carries a real text layer; anything shorter is treated as a
//! scan. The threshold counts Unicode scalar values, so a page of CJK text
//! needs the same number of characters as a page of ASCII.

use crate::backend::{PagedDocument, TextRun};
use crate::error::{ConvertError, Stage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Classification of a single page. Decided once, never revised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    NativeText,
    ScannedRaster,
}

/// Document-level rendering mode for word output.
///
/// `Text` when at least one page is native text; `Image` only when every
/// page is a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    Text,
    Image,
}

/// Concatenate runs with a single space, in extraction order.
pub fn join_runs(runs: &[TextRun]) -> String {
    let mut out = String::new();
    for (i, run) in runs.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&run.text);
    }
    out
}

/// Classify already-extracted page text.
pub fn classify_text(text: &str, threshold: usize) -> PageKind {
    if text.trim().chars().count() > threshold {
        PageKind::NativeText
    } else {
        PageKind::ScannedRaster
    }
}

/// A page after classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPage {
    pub number: usize,
    pub text: String,
    kind: PageKind,
}

impl ClassifiedPage {
    pub fn from_runs(number: usize, runs: &[TextRun], threshold: usize) -> Self {
        let text = join_runs(runs);
        let kind = classify_text(&text, threshold);
        Self { number, text, kind }
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn is_native_text(&self) -> bool {
        self.kind == PageKind::NativeText
    }
}

/// Extract and classify page `number` of `doc`.
pub fn classify_page(
    doc: &dyn PagedDocument,
    number: usize,
    threshold: usize,
) -> Result<ClassifiedPage, ConvertError> {
    let runs = doc
        .text_runs(number)
        .map_err(|e| e.at_stage(Stage::Classify))?;
    let page = ClassifiedPage::from_runs(number, &runs, threshold);
    debug!(
        "Page {}: {} runs, {} chars → {:?}",
        number,
        runs.len(),
        page.text.trim().chars().count(),
        page.kind
    );
    Ok(page)
}

/// Fold page kinds into the document mode.
pub fn document_mode<I>(kinds: I) -> DocumentMode
where
    I: IntoIterator<Item = PageKind>,
{
    if kinds.into_iter().any(|k| k == PageKind::NativeText) {
        DocumentMode::Text
    } else {
        DocumentMode::Image
    }
}
