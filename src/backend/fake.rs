//! In-memory capability fakes for unit tests.

use super::{
    ArchiveFactory, ArchiveWriter, BlockEncoder, Mp3EncoderFactory, PageSource, PagedDocument,
    TextRun,
};
use crate::error::{ConvertError, Stage};
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub(crate) struct FakePage {
    pub runs: Vec<TextRun>,
    pub width: u32,
    pub height: u32,
}

impl FakePage {
    pub fn text(text: &str) -> Self {
        Self {
            runs: vec![TextRun::new(text, 10.0, 700.0)],
            width: 40,
            height: 60,
        }
    }

    pub fn scan() -> Self {
        Self {
            runs: Vec::new(),
            width: 40,
            height: 60,
        }
    }
}

/// A document whose pages are described up front.
#[derive(Debug, Default)]
pub(crate) struct FakePages {
    pub pages: Vec<FakePage>,
    pub renders: AtomicUsize,
    pub fail_render_at: Option<usize>,
}

impl FakePages {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl PageSource for FakePages {
    fn open<'a>(
        &'a self,
        _bytes: &'a [u8],
        _password: Option<&'a str>,
    ) -> Result<Box<dyn PagedDocument + 'a>, ConvertError> {
        Ok(Box::new(FakeDoc { source: self }))
    }
}

struct FakeDoc<'a> {
    source: &'a FakePages,
}

impl PagedDocument for FakeDoc<'_> {
    fn page_count(&self) -> usize {
        self.source.pages.len()
    }

    fn page_width(&self, number: usize) -> Result<f32, ConvertError> {
        page(self.source, number).map(|p| p.width as f32)
    }

    fn text_runs(&self, number: usize) -> Result<Vec<TextRun>, ConvertError> {
        page(self.source, number).map(|p| p.runs.clone())
    }

    fn render(&self, number: usize, scale: f32) -> Result<DynamicImage, ConvertError> {
        self.source.renders.fetch_add(1, Ordering::SeqCst);
        if self.source.fail_render_at == Some(number) {
            return Err(ConvertError::corrupt(Stage::Render, "page stream truncated"));
        }
        let p = page(self.source, number)?;
        let w = ((p.width as f32) * scale) as u32;
        let h = ((p.height as f32) * scale) as u32;
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba([30, 60, 90, 255]),
        )))
    }
}

fn page(source: &FakePages, number: usize) -> Result<&FakePage, ConvertError> {
    number
        .checked_sub(1)
        .and_then(|i| source.pages.get(i))
        .ok_or_else(|| ConvertError::Internal(format!("no page {number}")))
}

/// Records every block handed to the encoder and returns one byte per sample.
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordingMp3 {
    pub blocks: Arc<Mutex<Vec<(Vec<i16>, Option<Vec<i16>>)>>>,
    pub sessions: Arc<AtomicUsize>,
    pub silent: bool,
}

impl Mp3EncoderFactory for RecordingMp3 {
    fn create(
        &self,
        _channels: u8,
        _sample_rate: u32,
        _bitrate_kbps: u32,
    ) -> Result<Box<dyn BlockEncoder>, ConvertError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(RecordingSession {
            blocks: Arc::clone(&self.blocks),
            silent: self.silent,
        }))
    }
}

struct RecordingSession {
    blocks: Arc<Mutex<Vec<(Vec<i16>, Option<Vec<i16>>)>>>,
    silent: bool,
}

impl BlockEncoder for RecordingSession {
    fn encode_block(
        &mut self,
        left: &[i16],
        right: Option<&[i16]>,
    ) -> Result<Vec<u8>, ConvertError> {
        if let Ok(mut blocks) = self.blocks.lock() {
            blocks.push((left.to_vec(), right.map(<[i16]>::to_vec)));
        }
        Ok(if self.silent { Vec::new() } else { vec![0xAB; left.len()] })
    }

    fn flush(&mut self) -> Result<Vec<u8>, ConvertError> {
        Ok(if self.silent { Vec::new() } else { vec![0xFF; 4] })
    }
}

/// Archive that records entry names and concatenates payloads.
#[derive(Debug, Default, Clone)]
pub(crate) struct ListingArchive {
    pub entries: Arc<Mutex<Vec<String>>>,
}

impl ArchiveFactory for ListingArchive {
    fn create(&self) -> Box<dyn ArchiveWriter> {
        Box::new(ListingWriter {
            entries: Arc::clone(&self.entries),
            bytes: Vec::new(),
        })
    }
}

struct ListingWriter {
    entries: Arc<Mutex<Vec<String>>>,
    bytes: Vec<u8>,
}

impl ArchiveWriter for ListingWriter {
    fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ConvertError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(path.to_string());
        }
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ConvertError> {
        Ok(self.bytes)
    }
}
