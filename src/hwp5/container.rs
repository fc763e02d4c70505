//! Stream containers for HWP 5.0 documents.
//!
//! Documents are OLE compound files; [`StreamSource`] abstracts over them so
//! the decoder can also run over in-memory stream maps.

use crate::error::{Error, Result};
use cfb::CompoundFile;
use flate2::read::DeflateDecoder;
use log::debug;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Named byte streams grouped in storages, addressed as `Storage/Stream`.
pub trait StreamSource {
    /// Reads a whole stream.
    fn read_stream(&self, path: &str) -> Result<Vec<u8>>;

    fn stream_exists(&self, path: &str) -> bool;

    /// Names of the streams directly inside a storage (`""` for the root).
    fn list_streams(&self, storage: &str) -> Result<Vec<String>>;
}

/// OLE container of an HWP 5.0 document.
pub struct Hwp5Container {
    cfb: RefCell<CompoundFile<Cursor<Vec<u8>>>>,
}

impl Hwp5Container {
    /// Opens an HWP 5.0 container from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Opens an HWP 5.0 container from a reader.
    pub fn from_reader<R: Read + Seek>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Opens an HWP 5.0 container from bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let cursor = Cursor::new(data);
        let cfb = CompoundFile::open(cursor)
            .map_err(|e| Error::UnsupportedFormat(format!("not a compound file: {e}")))?;
        Ok(Self {
            cfb: RefCell::new(cfb),
        })
    }
}

fn absolute(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

impl StreamSource for Hwp5Container {
    fn read_stream(&self, path: &str) -> Result<Vec<u8>> {
        let mut cfb = self.cfb.borrow_mut();

        let mut stream = cfb
            .open_stream(absolute(path))
            .map_err(|_| Error::MissingComponent(path.to_string()))?;

        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;
        debug!("read stream {} ({} bytes)", path, data.len());
        Ok(data)
    }

    fn stream_exists(&self, path: &str) -> bool {
        self.cfb.borrow().is_stream(absolute(path))
    }

    fn list_streams(&self, storage: &str) -> Result<Vec<String>> {
        let cfb = self.cfb.borrow();
        let entries = cfb
            .read_storage(absolute(storage))
            .map_err(|_| Error::MissingComponent(storage.to_string()))?;
        Ok(entries
            .filter(|entry| entry.is_stream())
            .map(|entry| entry.name().to_string())
            .collect())
    }
}

/// In-memory stream map.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    streams: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a stream.
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> &mut Self {
        self.streams.insert(path.into(), data.into());
        self
    }
}

impl<P: Into<String>, D: Into<Vec<u8>>> FromIterator<(P, D)> for MemorySource {
    fn from_iter<T: IntoIterator<Item = (P, D)>>(iter: T) -> Self {
        let mut source = Self::new();
        for (path, data) in iter {
            source.insert(path, data);
        }
        source
    }
}

impl StreamSource for MemorySource {
    fn read_stream(&self, path: &str) -> Result<Vec<u8>> {
        self.streams
            .get(path)
            .cloned()
            .ok_or_else(|| Error::MissingComponent(path.to_string()))
    }

    fn stream_exists(&self, path: &str) -> bool {
        self.streams.contains_key(path)
    }

    fn list_streams(&self, storage: &str) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .streams
            .keys()
            .filter_map(|path| match storage {
                "" => Some(path.as_str()),
                _ => path.strip_prefix(storage)?.strip_prefix('/'),
            })
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect();
        if names.is_empty() && !storage.is_empty() {
            return Err(Error::MissingComponent(storage.to_string()));
        }
        Ok(names)
    }
}

/// Decompresses a stream using raw deflate.
pub fn decompress_stream(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut output = Vec::new();

    decoder
        .read_to_end(&mut output)
        .map_err(|e| Error::Decompression(e.to_string()))?;

    Ok(output)
}

/// Decodes UTF-16LE bytes to a String.
pub(crate) fn decode_utf16le(data: &[u8]) -> Result<String> {
    if !data.len().is_multiple_of(2) {
        return Err(Error::Encoding("Invalid UTF-16LE data length".into()));
    }

    let u16_iter = data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]));

    String::from_utf16(&u16_iter.collect::<Vec<_>>()).map_err(|e| Error::Encoding(e.to_string()))
}
