//! Container format detection.
//!
//! Only HWP 5.x compound files are decoded; the other Hangul formats are
//! recognised so callers get a precise error instead of a container failure.

use crate::error::{Error, Result};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Magic bytes for OLE Compound File (HWP 5.x)
const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Magic bytes for ZIP archive (HWPX)
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// ASCII signature for HWP 3.x
const HWP3_SIGNATURE: &[u8] = b"HWP Document File V";

/// Document container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    /// HWP 5.0+ binary format (OLE container)
    Hwp5,
    /// HWPX XML-based format (ZIP container)
    Hwpx,
    /// Legacy HWP 3.x format
    Hwp3,
}

impl std::fmt::Display for FormatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatType::Hwp5 => write!(f, "HWP 5.0"),
            FormatType::Hwpx => write!(f, "HWPX"),
            FormatType::Hwp3 => write!(f, "HWP 3.x"),
        }
    }
}

/// Detects the format of a file.
pub fn detect_format_from_path(path: impl AsRef<Path>) -> Result<FormatType> {
    let mut file = std::fs::File::open(path)?;
    detect_format(&mut file)
}

/// Detects the format of a reader, leaving it rewound.
pub fn detect_format<R: Read + Seek>(reader: &mut R) -> Result<FormatType> {
    let mut buffer = [0u8; 32];
    reader.seek(SeekFrom::Start(0))?;
    let bytes_read = reader.read(&mut buffer)?;
    reader.seek(SeekFrom::Start(0))?;
    detect_format_from_bytes(&buffer[..bytes_read])
}

/// Detects the format from the leading bytes of a document.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<FormatType> {
    if data.len() < 8 {
        return Err(Error::InvalidData("Data too small".into()));
    }

    if data[..8] == OLE_MAGIC {
        return Ok(FormatType::Hwp5);
    }
    if data[..4] == ZIP_MAGIC {
        return Ok(FormatType::Hwpx);
    }
    if data.starts_with(HWP3_SIGNATURE) {
        return Ok(FormatType::Hwp3);
    }

    Err(Error::UnsupportedFormat("unrecognised document signature".into()))
}

/// Fails unless `data` starts like an HWP 5.x compound file.
pub fn ensure_hwp5(data: &[u8]) -> Result<()> {
    match detect_format_from_bytes(data)? {
        FormatType::Hwp5 => Ok(()),
        other => Err(Error::UnsupportedFormat(format!("{other} documents"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_detect_ole_magic() {
        let data = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0x00, 0x00];
        assert_eq!(detect_format_from_bytes(&data).unwrap(), FormatType::Hwp5);
        assert!(ensure_hwp5(&data).is_ok());
    }

    #[test]
    fn test_detect_zip_magic() {
        let data = [0x50, 0x4B, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00];
        assert_eq!(detect_format_from_bytes(&data).unwrap(), FormatType::Hwpx);
        assert!(matches!(
            ensure_hwp5(&data),
            Err(Error::UnsupportedFormat(msg)) if msg == "HWPX documents"
        ));
    }

    #[test]
    fn test_detect_hwp3_signature() {
        let mut data = Vec::from(b"HWP Document File V3.0");
        data.resize(32, 0);
        let mut reader = Cursor::new(data);
        assert_eq!(detect_format(&mut reader).unwrap(), FormatType::Hwp3);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_detect_unknown() {
        let data = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            detect_format_from_bytes(&data[..4]),
            Err(Error::InvalidData(_))
        ));
    }
}
