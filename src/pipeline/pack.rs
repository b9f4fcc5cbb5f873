//! Page image export: one page yields the image itself, several yield an
//! archive.
//!
//! The plan is fixed from the page count before any page is rendered, so
//! a single-page document is always rendered at the sharper single-export
//! scale and never wrapped in an archive.

use super::render::{rasterize, RasterPage};
use crate::backend::{ArchiveFactory, ImageKind, PagedDocument, RasterCodec};
use crate::config::RasterPolicy;
use crate::error::{ConvertError, Stage};
use crate::progress::{Progress, ProgressUnit};
use tracing::info;

/// How the page images will be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPlan {
    /// Exactly one page: emit its JPEG directly.
    Direct,
    /// Several pages: bundle them into one archive.
    Archive { pages: usize },
}

impl ExportPlan {
    pub fn for_page_count(pages: usize) -> Result<Self, ConvertError> {
        match pages {
            0 => Err(ConvertError::corrupt(Stage::Open, "document has no pages")),
            1 => Ok(ExportPlan::Direct),
            pages => Ok(ExportPlan::Archive { pages }),
        }
    }

    /// Render scale and JPEG quality for this plan.
    pub fn raster_settings(self, policy: &RasterPolicy) -> (f32, f32) {
        match self {
            ExportPlan::Direct => (policy.single_export_scale, policy.single_export_quality),
            ExportPlan::Archive { .. } => (policy.multi_export_scale, policy.embed_quality),
        }
    }
}

/// Archive entry name for page `number`.
pub fn entry_name(number: usize) -> String {
    format!("images/page_{number}.{}", ImageKind::Jpeg.extension())
}

/// The exported artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum PackedImages {
    Direct(RasterPage),
    Archive { bytes: Vec<u8>, pages: usize },
}

impl PackedImages {
    pub fn pages(&self) -> usize {
        match self {
            PackedImages::Direct(_) => 1,
            PackedImages::Archive { pages, .. } => *pages,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            PackedImages::Direct(page) => page.bytes,
            PackedImages::Archive { bytes, .. } => bytes,
        }
    }
}

/// Render every page of `doc` and package the result per [`ExportPlan`].
pub fn export_pages(
    doc: &dyn PagedDocument,
    policy: &RasterPolicy,
    codec: &dyn RasterCodec,
    archive: &dyn ArchiveFactory,
    progress: Progress<'_>,
) -> Result<PackedImages, ConvertError> {
    let total = doc.page_count();
    let plan = ExportPlan::for_page_count(total)?;
    let (scale, quality) = plan.raster_settings(policy);
    progress.start(ProgressUnit::Page, total);

    let render = |number: usize| -> Result<RasterPage, ConvertError> {
        progress.unit_start(number, total);
        match rasterize(doc, number, scale, quality, codec) {
            Ok(page) => {
                progress.unit_complete(number, total, page.bytes.len());
                Ok(page)
            }
            Err(e) => {
                progress.unit_error(number, total, &e);
                Err(e)
            }
        }
    };

    let packed = match plan {
        ExportPlan::Direct => PackedImages::Direct(render(1)?),
        ExportPlan::Archive { pages } => {
            let mut writer = archive.create();
            for number in 1..=pages {
                let page = render(number)?;
                writer.add_file(&entry_name(number), &page.bytes)?;
            }
            PackedImages::Archive {
                bytes: writer.finish()?,
                pages,
            }
        }
    };

    let size = match &packed {
        PackedImages::Direct(page) => page.bytes.len(),
        PackedImages::Archive { bytes, .. } => bytes.len(),
    };
    info!("Exported {} page image(s) as {:?} ({} bytes)", total, plan, size);
    progress.complete(total, size);
    Ok(packed)
}
