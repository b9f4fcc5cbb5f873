//! Table reconstruction from positioned text runs.
//!
//! There is no real table detection here. Runs sharing a rounded baseline
//! form a row; the runs of a row become its fields in extraction order.
//! Rows are emitted top-to-bottom, which in PDF coordinates means
//! descending `y`.
//!
//! ## Output
//!
//! ```text
//! "Name","Qty"\n
//! "Widget","3"\n
//! \n                      ← page separator
//! ```
//!
//! Every field is double-quoted with embedded quotes doubled, so commas and
//! line breaks inside a run survive a round-trip through any CSV reader.

use crate::backend::{PagedDocument, TextRun};
use crate::error::{ConvertError, Stage};
use crate::progress::{Progress, ProgressUnit};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Row key for a baseline: nearest integer, halves rounding up.
///
/// `99.5` → `100` and `-0.5` → `0`, matching the usual screen-space
/// convention rather than round-half-away-from-zero.
pub fn row_key(y: f32) -> i64 {
    (f64::from(y) + 0.5).floor() as i64
}

/// Quote one field.
pub fn quote_field(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Bucket runs by row key, top row first. Field order within a row is
/// extraction order.
pub fn group_rows(runs: &[TextRun]) -> Vec<(i64, Vec<&str>)> {
    let mut rows: BTreeMap<i64, Vec<&str>> = BTreeMap::new();
    for run in runs {
        rows.entry(row_key(run.y)).or_default().push(run.text.as_str());
    }
    rows.into_iter().rev().collect()
}

/// Append one page's rows plus the page separator to `out`.
/// Returns the number of rows written.
pub fn write_page(out: &mut String, runs: &[TextRun]) -> usize {
    let rows = group_rows(runs);
    for (_, fields) in &rows {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&quote_field(field));
        }
        out.push('\n');
    }
    out.push('\n');
    rows.len()
}

/// Reconstructed table text for a whole document.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub csv: String,
    pub pages: usize,
    pub rows: usize,
}

/// Build the table for every page of `doc`, in page order.
pub fn build_table(doc: &dyn PagedDocument, progress: Progress<'_>) -> Result<Table, ConvertError> {
    let total = doc.page_count();
    if total == 0 {
        return Err(ConvertError::corrupt(Stage::Open, "document has no pages"));
    }
    progress.start(ProgressUnit::Page, total);

    let mut csv = String::new();
    let mut rows = 0;
    for number in 1..=total {
        progress.unit_start(number, total);
        let runs = match doc.text_runs(number) {
            Ok(runs) => runs,
            Err(e) => {
                progress.unit_error(number, total, &e);
                return Err(e.at_stage(Stage::Classify));
            }
        };
        let before = csv.len();
        let page_rows = write_page(&mut csv, &runs);
        debug!("Page {}: {} runs → {} rows", number, runs.len(), page_rows);
        rows += page_rows;
        progress.unit_complete(number, total, csv.len() - before);
    }

    info!("Table reconstructed: {} pages, {} rows", total, rows);
    progress.complete(total, csv.len());
    Ok(Table {
        csv,
        pages: total,
        rows,
    })
}
