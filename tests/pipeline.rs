//! Pipeline integration tests against in-memory capability fakes.
//!
//! Every capability except the raster codec and the archive writer is
//! faked, so these run without pdfium, LAME or any media files.
//!
//! Run with:
//!   cargo test --test pipeline

use edgequake_convert::backend::archive::ZipArchiveFactory;
use edgequake_convert::backend::lame::LameEncoderFactory;
use edgequake_convert::backend::raster::ImageCodec;
use edgequake_convert::backend::{
    AudioDecoder, BlockEncoder, Capabilities, DecodedAudio, Mp3EncoderFactory, PageSource,
    PagedDocument, TextRun,
};
use edgequake_convert::{
    convert_asset, summarize_asset, ConversionConfig, ConversionDetails, ConversionKind,
    ConversionProgressCallback, ConvertError, DocumentMode, OutputKind, PageKind, ProgressUnit,
    SourceAsset, SourceKind, Stage,
};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Page {
    runs: Vec<TextRun>,
    width: u32,
    height: u32,
}

fn text_page(runs: &[(&str, f32)]) -> Page {
    Page {
        runs: runs.iter().map(|(t, y)| TextRun::new(*t, 0.0, *y)).collect(),
        width: 50,
        height: 70,
    }
}

fn scan_page() -> Page {
    text_page(&[])
}

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    renders: AtomicUsize,
    decodes: AtomicUsize,
    sessions: AtomicUsize,
    blocks: AtomicUsize,
}

struct FakePdf {
    pages: Vec<Page>,
    password: Option<&'static str>,
    counters: Arc<Counters>,
}

impl PageSource for FakePdf {
    fn open<'a>(
        &'a self,
        _bytes: &'a [u8],
        password: Option<&'a str>,
    ) -> Result<Box<dyn PagedDocument + 'a>, ConvertError> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        match (self.password, password) {
            (Some(_), None) => return Err(ConvertError::PasswordRequired),
            (Some(expected), Some(given)) if expected != given => {
                return Err(ConvertError::WrongPassword)
            }
            _ => {}
        }
        Ok(Box::new(FakeDoc { pdf: self }))
    }
}

struct FakeDoc<'a> {
    pdf: &'a FakePdf,
}

impl FakeDoc<'_> {
    fn page(&self, number: usize) -> Result<&Page, ConvertError> {
        self.pdf
            .pages
            .get(number - 1)
            .ok_or_else(|| ConvertError::Internal(format!("no page {number}")))
    }
}

impl PagedDocument for FakeDoc<'_> {
    fn page_count(&self) -> usize {
        self.pdf.pages.len()
    }

    fn page_width(&self, number: usize) -> Result<f32, ConvertError> {
        Ok(self.page(number)?.width as f32)
    }

    fn text_runs(&self, number: usize) -> Result<Vec<TextRun>, ConvertError> {
        Ok(self.page(number)?.runs.clone())
    }

    fn render(&self, number: usize, scale: f32) -> Result<DynamicImage, ConvertError> {
        self.pdf.counters.renders.fetch_add(1, Ordering::SeqCst);
        let p = self.page(number)?;
        let (w, h) = ((p.width as f32 * scale) as u32, (p.height as f32 * scale) as u32);
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba([number as u8 * 40, 90, 160, 255]),
        )))
    }
}

struct FakeAudio {
    audio: DecodedAudio,
    counters: Arc<Counters>,
}

impl AudioDecoder for FakeAudio {
    fn decode(&self, _bytes: &[u8], _hint: Option<&str>) -> Result<DecodedAudio, ConvertError> {
        self.counters.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(self.audio.clone())
    }
}

struct CountingMp3 {
    counters: Arc<Counters>,
}

impl Mp3EncoderFactory for CountingMp3 {
    fn create(
        &self,
        _channels: u8,
        _sample_rate: u32,
        _bitrate_kbps: u32,
    ) -> Result<Box<dyn BlockEncoder>, ConvertError> {
        self.counters.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingSession {
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct CountingSession {
    counters: Arc<Counters>,
}

impl BlockEncoder for CountingSession {
    fn encode_block(
        &mut self,
        left: &[i16],
        _right: Option<&[i16]>,
    ) -> Result<Vec<u8>, ConvertError> {
        self.counters.blocks.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0x55; left.len() / 8])
    }

    fn flush(&mut self) -> Result<Vec<u8>, ConvertError> {
        Ok(vec![0xFF, 0xFB])
    }
}

struct Harness {
    caps: Capabilities,
    counters: Arc<Counters>,
}

fn harness(pages: Vec<Page>) -> Harness {
    harness_with(pages, None, silence(2, 10))
}

fn harness_with(pages: Vec<Page>, password: Option<&'static str>, audio: DecodedAudio) -> Harness {
    let counters = Arc::new(Counters::default());
    let caps = Capabilities {
        pages: Box::new(FakePdf {
            pages,
            password,
            counters: Arc::clone(&counters),
        }),
        raster: Box::new(ImageCodec),
        audio: Box::new(FakeAudio {
            audio,
            counters: Arc::clone(&counters),
        }),
        mp3: Box::new(CountingMp3 {
            counters: Arc::clone(&counters),
        }),
        archive: Box::new(ZipArchiveFactory),
    };
    Harness { caps, counters }
}

fn silence(channels: usize, frames: usize) -> DecodedAudio {
    DecodedAudio {
        sample_rate: 44_100,
        channels: vec![vec![0.0; frames]; channels],
    }
}

fn pdf(name: &str) -> SourceAsset {
    SourceAsset::new(name, SourceKind::Pdf, b"%PDF-1.7\n".to_vec())
}

fn run(h: &Harness, asset: &SourceAsset, kind: ConversionKind) -> Result<edgequake_convert::ConversionResult, ConvertError> {
    convert_asset(asset, kind, &ConversionConfig::default(), &h.caps)
}

fn zip_entries(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).expect("valid zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

// ── PDF → images ─────────────────────────────────────────────────────────────

#[test]
fn single_page_pdf_exports_a_direct_jpeg() {
    let h = harness(vec![scan_page()]);
    let result = run(&h, &pdf("flyer.pdf"), ConversionKind::PdfToImages).unwrap();

    assert_eq!(result.kind, OutputKind::Jpg);
    assert_eq!(result.suggested_name, "flyer.jpg");
    assert!(result.bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    let decoded = image::load_from_memory(&result.bytes).unwrap();
    // 50×70 pt page at the single-export scale of 2.0.
    assert_eq!((decoded.width(), decoded.height()), (100, 140));
    assert_eq!(
        result.details,
        Some(ConversionDetails::Images {
            pages: 1,
            archived: false
        })
    );
}

#[test]
fn two_page_pdf_exports_an_archive_with_exactly_two_entries() {
    let h = harness(vec![scan_page(), scan_page()]);
    let result = run(&h, &pdf("brochure.pdf"), ConversionKind::PdfToImages).unwrap();

    assert_eq!(result.kind, OutputKind::Zip);
    assert_eq!(result.suggested_name, "brochure_images.zip");
    assert_eq!(
        zip_entries(&result.bytes),
        vec!["images/page_1.jpg", "images/page_2.jpg"]
    );

    let mut archive = zip::ZipArchive::new(Cursor::new(result.bytes)).unwrap();
    let mut page2 = Vec::new();
    archive
        .by_name("images/page_2.jpg")
        .unwrap()
        .read_to_end(&mut page2)
        .unwrap();
    let decoded = image::load_from_memory(&page2).unwrap();
    // Multi-page exports render at 1.5.
    assert_eq!((decoded.width(), decoded.height()), (75, 105));
}

#[test]
fn empty_pdf_is_rejected_for_export() {
    let h = harness(vec![]);
    let err = run(&h, &pdf("empty.pdf"), ConversionKind::PdfToImages).unwrap_err();
    assert!(matches!(err, ConvertError::UnsupportedOrCorruptSource { .. }));
    assert_eq!(h.counters.renders.load(Ordering::SeqCst), 0);
}

// ── PDF → table ──────────────────────────────────────────────────────────────

#[test]
fn table_groups_baselines_and_escapes_quotes() {
    let h = harness(vec![
        text_page(&[
            ("Item", 700.2),
            ("Note", 699.8),
            ("Widget", 680.0),
            ("He said \"hi\"", 680.4),
        ]),
        text_page(&[("Total", 100.0)]),
    ]);
    let result = run(&h, &pdf("invoice.pdf"), ConversionKind::PdfToTable).unwrap();

    assert_eq!(result.kind, OutputKind::Csv);
    assert_eq!(result.suggested_name, "invoice.csv");
    let csv = String::from_utf8(result.bytes).unwrap();
    assert_eq!(
        csv,
        "\"Item\",\"Note\"\n\"Widget\",\"He said \"\"hi\"\"\"\n\n\"Total\"\n\n"
    );
    assert_eq!(
        result.details,
        Some(ConversionDetails::Table { pages: 2, rows: 3 })
    );
    assert_eq!(h.counters.renders.load(Ordering::SeqCst), 0);
}

// ── PDF → word ───────────────────────────────────────────────────────────────

#[test]
fn fifty_characters_is_a_scan_and_fifty_one_is_text() {
    let fifty = "a".repeat(50);
    let fifty_one = "a".repeat(51);

    let h = harness(vec![text_page(&[(fifty.as_str(), 500.0)])]);
    let scan = run(&h, &pdf("a.pdf"), ConversionKind::PdfToWord).unwrap();
    assert!(scan.details.as_ref().unwrap().used_image_fallback());
    assert_eq!(h.counters.renders.load(Ordering::SeqCst), 1);

    let h = harness(vec![text_page(&[(fifty_one.as_str(), 500.0)])]);
    let text = run(&h, &pdf("a.pdf"), ConversionKind::PdfToWord).unwrap();
    assert!(!text.details.as_ref().unwrap().used_image_fallback());
    assert_eq!(h.counters.renders.load(Ordering::SeqCst), 0);
    let body = String::from_utf8(text.bytes).unwrap();
    assert!(body.contains(&format!("<p style=\"page-break-after: always;\">{fifty_one}</p>")));
}

#[test]
fn word_document_keeps_page_order_and_reports_mode() {
    let long = "The committee approved the revised budget for the coming fiscal year.";
    let h = harness(vec![text_page(&[(long, 700.0)]), scan_page(), text_page(&[(long, 700.0)])]);
    let result = run(&h, &pdf("minutes.pdf"), ConversionKind::PdfToWord).unwrap();

    assert_eq!(result.kind, OutputKind::Doc);
    assert_eq!(result.suggested_name, "minutes.doc");
    assert_eq!(
        result.details,
        Some(ConversionDetails::Document {
            pages: 3,
            mode: DocumentMode::Text,
            text_pages: 2,
            image_pages: 1
        })
    );
    let body = String::from_utf8(result.bytes).unwrap();
    assert!(body.starts_with('\u{feff}'));
    let first = body.find(long).unwrap();
    let image = body.find("data:image/jpeg;base64,").unwrap();
    let last = body.rfind(long).unwrap();
    assert!(first < image && image < last);
    // 50 pt page × 1.5 = 75 px, embedded at 75 × 0.75 = 56.25 pt.
    assert!(body.contains("width=\"56.25pt\""));
}

#[test]
fn word_text_is_escaped() {
    let text = "if a < b && c > d then print \"ok\" and carry on with the rest";
    let h = harness(vec![text_page(&[(text, 10.0)])]);
    let result = run(&h, &pdf("code.pdf"), ConversionKind::PdfToWord).unwrap();
    let body = String::from_utf8(result.bytes).unwrap();
    assert!(body.contains("a &lt; b &amp;&amp; c &gt; d"));
    assert!(!body.contains("a < b"));
}

// ── PDF → slides ─────────────────────────────────────────────────────────────

#[test]
fn slides_have_one_image_per_page() {
    let h = harness(vec![scan_page(), scan_page(), scan_page()]);
    let result = run(&h, &pdf("talk.pdf"), ConversionKind::PdfToSlides).unwrap();

    assert_eq!(result.kind, OutputKind::Pptx);
    assert_eq!(result.suggested_name, "talk.pptx");
    assert_eq!(result.details, Some(ConversionDetails::Slides { slides: 3 }));
    assert_eq!(h.counters.renders.load(Ordering::SeqCst), 3);

    let entries = zip_entries(&result.bytes);
    for n in 1..=3 {
        assert!(entries.contains(&format!("ppt/slides/slide{n}.xml")));
        assert!(entries.contains(&format!("ppt/media/image{n}.jpeg")));
    }
    assert!(!entries.contains(&"ppt/slides/slide4.xml".to_string()));
    assert!(entries.contains(&"[Content_Types].xml".to_string()));
}

// ── Source and password errors ───────────────────────────────────────────────

#[test]
fn wrong_source_kind_is_rejected_before_opening() {
    let h = harness(vec![scan_page()]);
    let image = SourceAsset::new("photo.png", SourceKind::Image, vec![0x89, b'P', b'N', b'G']);
    let err = run(&h, &image, ConversionKind::PdfToTable).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::SourceKindMismatch {
            kind: ConversionKind::PdfToTable,
            expected: SourceKind::Pdf,
            found: SourceKind::Image
        }
    ));
    assert_eq!(h.counters.opens.load(Ordering::SeqCst), 0);
}

#[test]
fn encrypted_pdf_requires_the_right_password() {
    let h = harness_with(vec![scan_page()], Some("s3cret"), silence(1, 1));
    let asset = pdf("locked.pdf");

    let err = run(&h, &asset, ConversionKind::PdfToImages).unwrap_err();
    assert!(matches!(err, ConvertError::PasswordRequired));

    let wrong = ConversionConfig::builder().password("guess").build().unwrap();
    let err = convert_asset(&asset, ConversionKind::PdfToImages, &wrong, &h.caps).unwrap_err();
    assert!(matches!(err, ConvertError::WrongPassword));

    let right = ConversionConfig::builder().password("s3cret").build().unwrap();
    assert!(convert_asset(&asset, ConversionKind::PdfToImages, &right, &h.caps).is_ok());
}

// ── Image compression ────────────────────────────────────────────────────────

fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

#[test]
fn compression_prescales_and_names_output() {
    let h = harness(vec![]);
    let asset = SourceAsset::from_bytes("photo.png", gradient_png(3000, 1000)).unwrap();
    let result = run(&h, &asset, ConversionKind::ImageCompress).unwrap();

    assert_eq!(result.kind, OutputKind::Jpg);
    assert_eq!(result.suggested_name, "compressed_photo.jpg");
    let Some(ConversionDetails::Compression {
        width,
        height,
        attempts,
        target_met,
        ..
    }) = result.details
    else {
        panic!("expected compression details");
    };
    assert!(width <= 2000 && height <= 2000);
    assert_eq!(width, 2000);
    assert_eq!(height, 666);
    assert!((1..=10).contains(&attempts));
    if target_met {
        assert!(result.bytes.len() as u64 <= 800 * 1024);
    }
}

#[test]
fn compression_gives_up_after_ten_attempts() {
    let h = harness(vec![]);
    let asset = SourceAsset::from_bytes("photo.png", gradient_png(400, 400)).unwrap();
    let config = ConversionConfig::builder().target_bytes(1).build().unwrap();
    let result = convert_asset(&asset, ConversionKind::ImageCompress, &config, &h.caps).unwrap();
    let Some(ConversionDetails::Compression {
        attempts,
        target_met,
        quality,
        width,
        ..
    }) = result.details
    else {
        panic!("expected compression details");
    };
    assert_eq!(attempts, 10);
    assert!(!target_met);
    assert_eq!(quality, 50);
    // Five shrinks to 90%: 400 → 360 → 324 → 291 → 261 → 234.
    assert_eq!(width, 234);
}

#[test]
fn undecodable_image_is_corrupt_source() {
    let h = harness(vec![]);
    let asset = SourceAsset::new("broken.jpg", SourceKind::Image, vec![0xFF, 0xD8, 0xFF, 0x00]);
    let err = run(&h, &asset, ConversionKind::ImageCompress).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::UnsupportedOrCorruptSource { stage: Stage::Open, .. }
    ));
}

// ── Video → audio ────────────────────────────────────────────────────────────

#[test]
fn oversized_video_is_rejected_before_decode() {
    let h = harness(vec![]);
    let asset = SourceAsset::new("long.mp4", SourceKind::Video, vec![0u8; 60 * 1024 * 1024]);
    let err = run(&h, &asset, ConversionKind::VideoToAudio).unwrap_err();

    assert!(matches!(
        err,
        ConvertError::ResourceCeilingExceeded {
            size: 62_914_560,
            limit: 52_428_800
        }
    ));
    assert_eq!(h.counters.decodes.load(Ordering::SeqCst), 0);
    assert_eq!(h.counters.sessions.load(Ordering::SeqCst), 0);
    assert_eq!(h.counters.blocks.load(Ordering::SeqCst), 0);
}

#[test]
fn video_audio_is_encoded_in_full_blocks() {
    let h = harness_with(vec![], None, silence(2, 3000));
    let asset = SourceAsset::new("talk.mp4", SourceKind::Video, vec![0u8; 1024]);
    let result = run(&h, &asset, ConversionKind::VideoToAudio).unwrap();

    assert_eq!(result.kind, OutputKind::Mp3);
    assert_eq!(result.suggested_name, "talk.mp3");
    assert_eq!(
        result.details,
        Some(ConversionDetails::Audio {
            sample_rate: 44_100,
            channels: 2,
            frames: 3000,
            blocks: 3
        })
    );
    assert_eq!(h.counters.blocks.load(Ordering::SeqCst), 3);
    // 144 + 144 + 87 block bytes plus the 2-byte flush.
    assert_eq!(result.bytes.len(), 144 + 144 + 87 + 2);
}

#[test]
fn real_lame_encodes_a_short_tone() {
    let frames = 44_100 / 2;
    let tone: Vec<f32> = (0..frames)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 44_100.0).sin() * 0.5)
        .collect();
    let mut h = harness_with(
        vec![],
        None,
        DecodedAudio {
            sample_rate: 44_100,
            channels: vec![tone],
        },
    );
    h.caps.mp3 = Box::new(LameEncoderFactory);
    let asset = SourceAsset::new("beep.webm", SourceKind::Video, vec![0u8; 16]);
    let result = run(&h, &asset, ConversionKind::VideoToAudio).unwrap();
    assert!(!result.bytes.is_empty());
    // MPEG audio frames start with an 11-bit sync word.
    let synced = result
        .bytes
        .windows(2)
        .any(|w| w[0] == 0xFF && (w[1] & 0xE0) == 0xE0);
    assert!(synced, "no MPEG frame sync found");
}

// ── Progress and inspection ──────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, unit: ProgressUnit, total: usize) {
        self.events.lock().unwrap().push(format!("start {unit:?} {total}"));
    }

    fn on_unit_complete(&self, n: usize, total: usize, _bytes: usize) {
        self.events.lock().unwrap().push(format!("done {n}/{total}"));
    }

    fn on_conversion_complete(&self, units: usize, _output_bytes: usize) {
        self.events.lock().unwrap().push(format!("complete {units}"));
    }
}

#[test]
fn progress_reports_pages_in_order() {
    let h = harness(vec![scan_page(), text_page(&[("x", 1.0)])]);
    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    convert_asset(&pdf("p.pdf"), ConversionKind::PdfToTable, &config, &h.caps).unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["start Page 2", "done 1/2", "done 2/2", "complete 2"]
    );
}

#[test]
fn summary_classifies_every_page() {
    let long = "y".repeat(80);
    let h = harness(vec![scan_page(), text_page(&[(long.as_str(), 1.0)])]);
    let summary = summarize_asset(&pdf("mixed.pdf"), &ConversionConfig::default(), &h.caps).unwrap();
    assert_eq!(summary.pages, Some(2));
    assert_eq!(
        summary.page_kinds,
        vec![PageKind::ScannedRaster, PageKind::NativeText]
    );
    assert_eq!(summary.mode, Some(DocumentMode::Text));
    assert_eq!(h.counters.renders.load(Ordering::SeqCst), 0);
}
