//! Archive writer backed by the `zip` crate.
//!
//! Used both for multi-page image exports and as the container for OOXML
//! slide decks, which are ZIP packages with a fixed part layout.

use super::{ArchiveFactory, ArchiveWriter};
use crate::error::{ConvertError, Stage};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// [`ArchiveFactory`] producing in-memory ZIP archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveFactory;

impl ArchiveFactory for ZipArchiveFactory {
    fn create(&self) -> Box<dyn ArchiveWriter> {
        Box::new(ZipArchive {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entries: 0,
        })
    }
}

struct ZipArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entries: usize,
}

impl ArchiveWriter for ZipArchive {
    fn add_file(&mut self, path: &str, bytes: &[u8]) -> Result<(), ConvertError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.writer
            .start_file(path, options)
            .map_err(|e| ConvertError::encode(Stage::Pack, format!("zip entry '{path}': {e}")))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| ConvertError::encode(Stage::Pack, format!("zip write '{path}': {e}")))?;
        self.entries += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>, ConvertError> {
        let this = *self;
        let entries = this.entries;
        let cursor = this
            .writer
            .finish()
            .map_err(|e| ConvertError::encode(Stage::Pack, format!("zip finalize: {e}")))?;
        let bytes = cursor.into_inner();
        tracing::debug!("Archive finalised: {} entries, {} bytes", entries, bytes.len());
        Ok(bytes)
    }
}
