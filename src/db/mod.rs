mod anomaly;
mod field;
pub mod file_header;
pub mod page;

use super::{err, utils, DecodeError, Error, Result};
use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use std::{fs::File, io::Read, path::Path};

pub use anomaly::Anomaly;
pub use field::{Decoded, Field, FieldValue};
pub use file_header::{DatabaseHeader, FILE_HEADER_SIZE};
pub use page::{PageHeader, PageNum, PageType};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
const MIN_PAGE_SIZE: usize = 512;
const MAX_PAGE_SIZE: usize = 65536;

#[derive(Debug)]
pub struct ChunkSourceBuilder<R: Read> {
    page_size: Option<usize>,
    max_chunks: Option<usize>,
    readable: Option<R>,
}

impl<R: Read> ChunkSourceBuilder<R> {
    /// Fixes the chunk size instead of reading it from the file header.
    pub fn page_size(self, page_size: Option<usize>) -> Self {
        Self { page_size, ..self }
    }

    pub fn max_chunks(self, max_chunks: usize) -> Self {
        Self {
            max_chunks: Some(max_chunks),
            ..self
        }
    }

    pub fn readable(self, r: R) -> Self {
        Self {
            readable: Some(r),
            ..self
        }
    }

    pub fn build(self) -> Result<ChunkSource<R>> {
        let Self {
            page_size,
            max_chunks,
            readable,
        } = self;

        if let Some(size) = page_size {
            if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&size) || !size.is_power_of_two() {
                return Err(err!("Invalid page size: {size}"));
            }
        }

        Ok(ChunkSource {
            reader: readable.ok_or(err!("ChunkSource needs a readable source"))?,
            page_size,
            remaining: max_chunks,
            next_number: 1,
            done: false,
        })
    }
}

impl ChunkSource<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ChunkSourceBuilder<File>> {
        File::open(path)
            .map(|file| ChunkSource::builder().readable(file))
            .map_err(Error::from)
    }
}

/// Splits a database file into page-sized chunks, the first one holding the
/// file header together with page 1.
///
/// The sequence is read once, front to back. A short final chunk is still
/// yielded so the decoder can reject it.
#[derive(Debug)]
pub struct ChunkSource<R: Read> {
    reader: R,
    page_size: Option<usize>,
    remaining: Option<usize>,
    next_number: PageNum,
    done: bool,
}

impl<R: Read> ChunkSource<R> {
    pub fn builder() -> ChunkSourceBuilder<R> {
        ChunkSourceBuilder {
            page_size: None,
            max_chunks: None,
            readable: None,
        }
    }

    /// Chunk size in use, known once the first chunk has been read.
    pub fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut buf = BytesMut::zeroed(self.page_size.unwrap_or(FILE_HEADER_SIZE));
        let mut filled = read_full(&mut self.reader, &mut buf)?;

        if self.page_size.is_none() {
            let page_size = if filled < FILE_HEADER_SIZE {
                DEFAULT_PAGE_SIZE
            } else {
                detect_page_size(&buf)
            };
            self.page_size = Some(page_size);

            if filled == FILE_HEADER_SIZE {
                buf.resize(page_size, 0);
                filled += read_full(&mut self.reader, &mut buf[FILE_HEADER_SIZE..])?;
            }
        }

        if filled == 0 {
            return Ok(None);
        }

        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if filled < page_size {
            warn!(
                "Short read for page {}: {filled} of {page_size} bytes",
                self.next_number
            );
            self.done = true;
        }
        buf.truncate(filled);

        let chunk = Chunk {
            number: self.next_number,
            page_size,
            data: buf.freeze(),
        };
        debug!("Read page {} ({} bytes)", chunk.number, chunk.data.len());
        self.next_number += 1;
        Ok(Some(chunk))
    }
}

impl<R: Read> Iterator for ChunkSource<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == Some(0) {
            return None;
        }
        if let Some(n) = self.remaining.as_mut() {
            *n -= 1;
        }

        match self.read_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// One page-sized buffer. `number` is the 1-based page number.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub number: PageNum,
    pub page_size: usize,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkLayout {
    Database(Decoded<DatabaseHeader>),
    Page(Decoded<PageHeader>),
}

impl ChunkLayout {
    pub fn fields(&self) -> &[Field] {
        match self {
            Self::Database(decoded) => &decoded.fields,
            Self::Page(decoded) => &decoded.fields,
        }
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        match self {
            Self::Database(decoded) => &decoded.anomalies,
            Self::Page(decoded) => &decoded.anomalies,
        }
    }
}

impl Chunk {
    pub fn decode(&self) -> std::result::Result<ChunkLayout, DecodeError> {
        if self.data.len() < self.page_size {
            return Err(DecodeError::TruncatedBuffer {
                offset: 0,
                needed: self.page_size,
                available: self.data.len(),
            });
        }

        if self.number == 1 {
            DatabaseHeader::decode(&self.data).map(ChunkLayout::Database)
        } else {
            PageHeader::decode(&self.data, 0).map(ChunkLayout::Page)
        }
    }
}

fn detect_page_size(header: &[u8]) -> usize {
    let stored = u16::from_be_bytes(utils::read_2_bytes(header, 16).unwrap_or_default());
    file_header::page_size_bytes(stored).unwrap_or_else(|| {
        warn!("Header page size {stored} is invalid, using {DEFAULT_PAGE_SIZE}");
        DEFAULT_PAGE_SIZE
    })
}

// Like `read_exact`, but a source that ends early is not an error.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::from(e)),
        }
    }
    Ok(filled)
}
