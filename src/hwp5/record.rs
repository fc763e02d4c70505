//! Record parsing for HWP 5.0 streams.
//!
//! HWP 5.0 uses a TLV (Tag-Length-Value) record format with 4-byte headers.

use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use log::trace;
use std::io::{self, Read};

/// Tag IDs for HWP 5.0 records.
/// Based on HWPTAG_BEGIN = 0x10 (16)
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagId {
    // DocInfo tags (0x10 - 0x31)
    DocumentProperties = 16,
    IdMappings = 17,
    BinData = 18,
    FaceName = 19,
    BorderFill = 20,
    CharShape = 21,
    TabDef = 22,
    Numbering = 23,
    Bullet = 24,
    ParaShape = 25,
    Style = 26,
    DocData = 27,
    DistributeDocData = 28,
    CompatibleDocument = 30,
    LayoutCompatibility = 31,
    TrackChange = 32,

    // BodyText tags (0x42 = 66+)
    ParaHeader = 66,
    ParaText = 67,
    ParaCharShape = 68,
    ParaLineSeg = 69,
    ParaRangeTag = 70,
    CtrlHeader = 71,
    ListHeader = 72,
    PageDef = 73,
    FootnoteShape = 74,
    PageBorderFill = 75,

    // Extended control tags (0x4C = 76+)
    ShapeComponent = 76,
    Table = 77,
    ShapeComponentLine = 78,
    ShapeComponentRectangle = 79,
    ShapeComponentEllipse = 80,
    ShapeComponentArc = 81,
    ShapeComponentPolygon = 82,
    ShapeComponentCurve = 83,
    ShapeComponentOle = 84,
    ShapeComponentPicture = 85,
    ShapeComponentContainer = 86,
    CtrlData = 87,
    EqEdit = 88,
    ShapeComponentTextArt = 90,
    FormObject = 91,
    MemoShape = 92,
    MemoList = 93,
    ForbiddenChar = 94,
    ChartData = 95,
    TrackChangeContent = 96,
    TrackChangeAuthor = 97,
    VideoData = 98,
    ShapeComponentUnknown = 115,

    // Unknown tag
    Unknown = 0xFFFF,
}

impl From<u16> for TagId {
    fn from(value: u16) -> Self {
        match value {
            // DocInfo tags (0x10 - 0x31)
            16 => TagId::DocumentProperties,
            17 => TagId::IdMappings,
            18 => TagId::BinData,
            19 => TagId::FaceName,
            20 => TagId::BorderFill,
            21 => TagId::CharShape,
            22 => TagId::TabDef,
            23 => TagId::Numbering,
            24 => TagId::Bullet,
            25 => TagId::ParaShape,
            26 => TagId::Style,
            27 => TagId::DocData,
            28 => TagId::DistributeDocData,
            30 => TagId::CompatibleDocument,
            31 => TagId::LayoutCompatibility,
            32 => TagId::TrackChange,
            // BodyText tags (0x42 = 66+)
            66 => TagId::ParaHeader,
            67 => TagId::ParaText,
            68 => TagId::ParaCharShape,
            69 => TagId::ParaLineSeg,
            70 => TagId::ParaRangeTag,
            71 => TagId::CtrlHeader,
            72 => TagId::ListHeader,
            73 => TagId::PageDef,
            74 => TagId::FootnoteShape,
            75 => TagId::PageBorderFill,
            // Extended control tags (0x4C = 76+)
            76 => TagId::ShapeComponent,
            77 => TagId::Table,
            78 => TagId::ShapeComponentLine,
            79 => TagId::ShapeComponentRectangle,
            80 => TagId::ShapeComponentEllipse,
            81 => TagId::ShapeComponentArc,
            82 => TagId::ShapeComponentPolygon,
            83 => TagId::ShapeComponentCurve,
            84 => TagId::ShapeComponentOle,
            85 => TagId::ShapeComponentPicture,
            86 => TagId::ShapeComponentContainer,
            87 => TagId::CtrlData,
            88 => TagId::EqEdit,
            90 => TagId::ShapeComponentTextArt,
            91 => TagId::FormObject,
            92 => TagId::MemoShape,
            93 => TagId::MemoList,
            94 => TagId::ForbiddenChar,
            95 => TagId::ChartData,
            96 => TagId::TrackChangeContent,
            97 => TagId::TrackChangeAuthor,
            98 => TagId::VideoData,
            115 => TagId::ShapeComponentUnknown,
            _ => TagId::Unknown,
        }
    }
}

/// Record header structure.
///
/// Layout (32 bits little-endian):
/// - Bits 0-9: Tag ID (0-1023)
/// - Bits 10-19: Level (nesting depth)
/// - Bits 20-31: Size (0-4095, or 0xFFF for extended)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Tag ID identifying the record type
    pub tag_id: u16,
    /// Nesting level
    pub level: u16,
    /// Data size in bytes
    pub size: u32,
}

impl RecordHeader {
    /// Size of a standard record header in bytes.
    pub const SIZE: usize = 4;
    /// Extended size sentinel value.
    pub const EXTENDED_SIZE_SENTINEL: u32 = 0xFFF;
    /// Largest tag id or level that fits in the header word.
    pub const MAX_FIELD: u16 = 0x3FF;

    /// Creates a header.
    pub fn new(tag_id: u16, level: u16, size: u32) -> Self {
        Self {
            tag_id,
            level,
            size,
        }
    }

    /// Parses a record header from bytes.
    ///
    /// Returns the header and the number of bytes consumed (4 or 8 for extended).
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedStream {
                offset: 0,
                needed: Self::SIZE,
                available: data.len(),
            });
        }

        let word = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let (mut header, size_field) = Self::from_word(word);

        if size_field == Self::EXTENDED_SIZE_SENTINEL {
            // Extended size: next 4 bytes contain actual size
            if data.len() < 8 {
                return Err(Error::TruncatedStream {
                    offset: Self::SIZE as u64,
                    needed: 4,
                    available: data.len() - Self::SIZE,
                });
            }
            header.size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
            Ok((header, 8))
        } else {
            Ok((header, 4))
        }
    }

    /// Splits a header word into a header and its raw 12-bit size field.
    fn from_word(word: u32) -> (Self, u32) {
        let tag_id = (word & 0x3FF) as u16;
        let level = ((word >> 10) & 0x3FF) as u16;
        let size_field = (word >> 20) & 0xFFF;
        (
            Self {
                tag_id,
                level,
                size: size_field,
            },
            size_field,
        )
    }

    /// Number of bytes `encode_into` writes for this header.
    pub fn encoded_len(&self) -> usize {
        if self.size >= Self::EXTENDED_SIZE_SENTINEL {
            8
        } else {
            4
        }
    }

    /// Writes the header in wire format.
    ///
    /// Sizes of 0xFFF and above use the extended size word.
    pub fn encode_into(&self, out: &mut impl BufMut) -> Result<()> {
        if self.tag_id > Self::MAX_FIELD || self.level > Self::MAX_FIELD {
            return Err(Error::InvalidData(format!(
                "tag {} / level {} does not fit in a record header",
                self.tag_id, self.level
            )));
        }

        let base = self.tag_id as u32 | (self.level as u32) << 10;
        if self.size >= Self::EXTENDED_SIZE_SENTINEL {
            out.put_u32_le(base | Self::EXTENDED_SIZE_SENTINEL << 20);
            out.put_u32_le(self.size);
        } else {
            out.put_u32_le(base | self.size << 20);
        }
        Ok(())
    }

    /// Returns the tag ID as an enum.
    pub fn tag(&self) -> TagId {
        TagId::from(self.tag_id)
    }
}

/// Appends one complete record (header and payload) to `out`.
pub fn encode_record(tag_id: u16, level: u16, payload: &[u8], out: &mut BytesMut) -> Result<()> {
    let size = u32::try_from(payload.len())
        .map_err(|_| Error::InvalidData("record payload exceeds u32::MAX bytes".into()))?;
    RecordHeader::new(tag_id, level, size).encode_into(out)?;
    out.put_slice(payload);
    Ok(())
}

/// A parsed record with header fields and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Tag ID identifying the record type
    pub tag_id: u16,
    /// Raw nesting level
    pub level: u16,
    /// Position of the record within its stream, starting at 0
    pub seqno: u32,
    /// Offset in the stream where this record's header starts
    pub offset: u64,
    /// Record data (payload)
    pub payload: Bytes,
}

impl Record {
    /// Returns the tag ID as an enum.
    pub fn tag(&self) -> TagId {
        TagId::from(self.tag_id)
    }

    /// Returns the data size.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Returns the record data.
    pub fn data(&self) -> &[u8] {
        &self.payload
    }
}

/// Reads records one at a time from a decompressed, decrypted stream.
pub struct RecordReader<R> {
    inner: R,
    seqno: u32,
    position: u64,
    finished: bool,
}

impl RecordReader<bytes::buf::Reader<Bytes>> {
    /// Creates a reader over an in-memory stream.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        use bytes::Buf;
        Self::new(data.into().reader())
    }
}

impl<R: Read> RecordReader<R> {
    /// Creates a new record reader. Sequence numbers start at 0.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            seqno: 0,
            position: 0,
            finished: false,
        }
    }

    /// Returns the current byte position in the stream.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Reads the next record, or `None` at a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let offset = self.position;

        let mut word = [0u8; 4];
        let got = self.fill(&mut word)?;
        if got == 0 {
            return Ok(None);
        }
        if got < word.len() {
            return Err(Error::TruncatedStream {
                offset,
                needed: word.len(),
                available: got,
            });
        }

        let (mut header, size_field) = RecordHeader::from_word(u32::from_le_bytes(word));
        if size_field == RecordHeader::EXTENDED_SIZE_SENTINEL {
            let mut extended = [0u8; 4];
            let got = self.fill(&mut extended)?;
            if got < extended.len() {
                return Err(Error::TruncatedStream {
                    offset,
                    needed: extended.len(),
                    available: got,
                });
            }
            header.size = u32::from_le_bytes(extended);
        }

        // Grow with the data actually present; a corrupt size must not
        // allocate up front
        let size = header.size as usize;
        let mut payload = Vec::with_capacity(size.min(1 << 16));
        let got = (&mut self.inner)
            .take(header.size as u64)
            .read_to_end(&mut payload)?;
        self.position += got as u64;
        if got < size {
            return Err(Error::TruncatedStream {
                offset,
                needed: size,
                available: got,
            });
        }

        trace!(
            "record #{}: tag {} level {} size {} at {}",
            self.seqno, header.tag_id, header.level, size, offset
        );
        let record = Record {
            tag_id: header.tag_id,
            level: header.level,
            seqno: self.seqno,
            offset,
            payload: Bytes::from(payload),
        };
        self.seqno += 1;
        Ok(Some(record))
    }

    /// Reads until `buf` is full or the stream ends; returns bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
