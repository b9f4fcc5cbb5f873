//! Slide-deck output: one full-bleed page image per slide, packaged as an
//! Office Open XML presentation.
//!
//! The deck is 16:9 (10 in × 5.625 in). Each page is rendered at the embed
//! scale and stretched over the whole slide, so pages with a portrait
//! aspect ratio appear widened.
//!
//! ## Package layout
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/{app,core}.xml
//! ppt/presentation.xml            ppt/_rels/presentation.xml.rels
//! ppt/presProps.xml
//! ppt/slideMasters/slideMaster1.xml (+ _rels)
//! ppt/slideLayouts/slideLayout1.xml (+ _rels)
//! ppt/theme/theme1.xml
//! ppt/slides/slide<n>.xml (+ _rels)   ppt/media/image<n>.jpeg
//! ```
//!
//! Fixed parts are written first; slides are then rendered and written one
//! at a time, so an N-page deck never holds more than one bitmap.

use super::render::rasterize;
use super::word::escape_markup;
use crate::backend::{ArchiveFactory, ArchiveWriter, PagedDocument, RasterCodec};
use crate::config::RasterPolicy;
use crate::error::{ConvertError, Stage};
use crate::progress::{Progress, ProgressUnit};
use std::fmt::Write as _;
use tracing::info;

/// Slide width in EMU (10 in).
pub const SLIDE_WIDTH_EMU: u64 = 9_144_000;
/// Slide height in EMU (5.625 in).
pub const SLIDE_HEIGHT_EMU: u64 = 5_143_500;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT: &str = "application/vnd.openxmlformats-officedocument.presentationml";

const APPLICATION: &str = "edgequake-convert";

const EMPTY_GROUP: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

/// A finished presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideDeck {
    pub bytes: Vec<u8>,
    pub slides: usize,
}

/// Render every page of `doc` onto its own slide.
pub fn build_deck(
    doc: &dyn PagedDocument,
    title: &str,
    policy: &RasterPolicy,
    codec: &dyn RasterCodec,
    archive: &dyn ArchiveFactory,
    progress: Progress<'_>,
) -> Result<SlideDeck, ConvertError> {
    let total = doc.page_count();
    if total == 0 {
        return Err(ConvertError::corrupt(Stage::Open, "document has no pages"));
    }
    progress.start(ProgressUnit::Page, total);

    let mut writer = archive.create();
    write_fixed_parts(writer.as_mut(), title, total)?;

    for number in 1..=total {
        progress.unit_start(number, total);
        let page = match rasterize(doc, number, policy.embed_scale, policy.embed_quality, codec) {
            Ok(page) => page,
            Err(e) => {
                progress.unit_error(number, total, &e);
                return Err(e);
            }
        };
        writer.add_file(&format!("ppt/media/image{number}.jpeg"), &page.bytes)?;
        writer.add_file(&format!("ppt/slides/slide{number}.xml"), slide_xml(number).as_bytes())?;
        writer.add_file(
            &format!("ppt/slides/_rels/slide{number}.xml.rels"),
            slide_rels(number).as_bytes(),
        )?;
        progress.unit_complete(number, total, page.bytes.len());
    }

    let bytes = writer.finish()?;
    info!("Slide deck built: {} slides, {} bytes", total, bytes.len());
    progress.complete(total, bytes.len());
    Ok(SlideDeck {
        bytes,
        slides: total,
    })
}

fn write_fixed_parts(
    writer: &mut dyn ArchiveWriter,
    title: &str,
    slides: usize,
) -> Result<(), ConvertError> {
    let parts: [(&str, String); 12] = [
        ("[Content_Types].xml", content_types(slides)),
        ("_rels/.rels", root_rels()),
        ("docProps/app.xml", app_props(slides)),
        ("docProps/core.xml", core_props(title)),
        ("ppt/presentation.xml", presentation(slides)),
        ("ppt/_rels/presentation.xml.rels", presentation_rels(slides)),
        ("ppt/presProps.xml", pres_props()),
        ("ppt/slideMasters/slideMaster1.xml", slide_master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            relationships(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ]),
        ),
        ("ppt/slideLayouts/slideLayout1.xml", slide_layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        ),
        ("ppt/theme/theme1.xml", theme()),
    ];
    for (path, xml) in &parts {
        writer.add_file(path, xml.as_bytes())?;
    }
    Ok(())
}

// ── Package parts ────────────────────────────────────────────────────────────

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    for (id, kind, target) in rels {
        let _ = write!(
            xml,
            r#"<Relationship Id="{id}" Type="{REL}/{kind}" Target="{target}"/>"#
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn content_types(slides: usize) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/ppt/presentation.xml" ContentType="{CT}.presentation.main+xml"/><Override PartName="/ppt/presProps.xml" ContentType="{CT}.presProps+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{CT}.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{CT}.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#
    );
    for n in 1..=slides {
        let _ = write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="{CT}.slide+xml"/>"#
        );
    }
    xml.push_str("</Types>");
    xml
}

fn root_rels() -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    xml.push_str(&format!(
        r#"<Relationship Id="rId1" Type="{REL}/officeDocument" Target="ppt/presentation.xml"/>"#
    ));
    xml.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
    xml.push_str(&format!(
        r#"<Relationship Id="rId3" Type="{REL}/extended-properties" Target="docProps/app.xml"/>"#
    ));
    xml.push_str("</Relationships>");
    xml
}

fn app_props(slides: usize) -> String {
    format!(
        r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>{APPLICATION}</Application><Slides>{slides}</Slides></Properties>"#
    )
}

fn core_props(title: &str) -> String {
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{}</dc:title><dc:creator>{APPLICATION}</dc:creator></cp:coreProperties>"#,
        escape_markup(title)
    )
}

fn presentation(slides: usize) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>"#
    );
    for n in 1..=slides {
        let _ = write!(xml, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2);
    }
    let _ = write!(
        xml,
        r#"</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    );
    xml
}

fn presentation_rels(slides: usize) -> String {
    let mut rels = vec![
        ("rId1".to_string(), "slideMaster", "slideMasters/slideMaster1.xml".to_string()),
        ("rId2".to_string(), "theme", "theme/theme1.xml".to_string()),
    ];
    for n in 1..=slides {
        rels.push((format!("rId{}", n + 2), "slide", format!("slides/slide{n}.xml")));
    }
    rels.push((format!("rId{}", slides + 3), "presProps", "presProps.xml".to_string()));
    let borrowed: Vec<(&str, &str, &str)> = rels
        .iter()
        .map(|(id, kind, target)| (id.as_str(), *kind, target.as_str()))
        .collect();
    relationships(&borrowed)
}

fn pres_props() -> String {
    format!(r#"{XML_DECL}<p:presentationPr xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"/>"#)
}

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{EMPTY_GROUP}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle/><p:bodyStyle/><p:otherStyle/></p:txStyles></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{EMPTY_GROUP}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn slide_xml(number: usize) -> String {
    format!(
        r#"{XML_DECL}<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree>{EMPTY_GROUP}<p:pic><p:nvPicPr><p:cNvPr id="2" name="Page {number}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{SLIDE_WIDTH_EMU}" cy="{SLIDE_HEIGHT_EMU}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

fn slide_rels(number: usize) -> String {
    let image = format!("../media/image{number}.jpeg");
    relationships(&[
        ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
        ("rId2", "image", image.as_str()),
    ])
}

fn theme() -> String {
    let solid = |v: &str| format!(r#"<a:solidFill><a:schemeClr val="{v}"/></a:solidFill>"#);
    let line = |w: u32| {
        format!(
            r#"<a:ln w="{w}" cap="flat" cmpd="sng" algn="ctr"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:prstDash val="solid"/></a:ln>"#
        )
    };
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    let fills = [solid("phClr"), solid("phClr"), solid("phClr")].concat();
    format!(
        concat!(
            r#"{decl}<a:theme xmlns:a="{ns}" name="Office Theme"><a:themeElements>"#,
            r#"<a:clrScheme name="Office">"#,
            r#"<a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
            r#"<a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>"#,
            r#"<a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2>"#,
            r#"<a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4>"#,
            r#"<a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6>"#,
            r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink>"#,
            r#"</a:clrScheme>"#,
            r#"<a:fontScheme name="Office">"#,
            r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
            r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
            r#"</a:fontScheme>"#,
            r#"<a:fmtScheme name="Office">"#,
            r#"<a:fillStyleLst>{fills}</a:fillStyleLst>"#,
            r#"<a:lnStyleLst>{l1}{l2}{l3}</a:lnStyleLst>"#,
            r#"<a:effectStyleLst>{e}{e}{e}</a:effectStyleLst>"#,
            r#"<a:bgFillStyleLst>{fills}</a:bgFillStyleLst>"#,
            r#"</a:fmtScheme></a:themeElements></a:theme>"#,
        ),
        decl = XML_DECL,
        ns = NS_A,
        fills = fills,
        l1 = line(6350),
        l2 = line(12700),
        l3 = line(19050),
        e = effect,
    )
}
