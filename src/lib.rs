//! # hwpv5
//!
//! A decoder for the HWP 5.0 binary document format used by the Hangul word
//! processor.
//!
//! HWP 5.0 documents are OLE compound files whose streams hold flat
//! sequences of tag/level/size records. This crate reads those records,
//! decodes them into typed models, rebuilds the nesting the levels encode
//! and reassembles paragraph text against its character-shape and
//! line-segment records.
//!
//! ## Quick Start
//!
//! ```no_run
//! use hwpv5::{hwp5::TreeEvent, model::Node};
//!
//! fn main() -> hwpv5::Result<()> {
//!     let file = hwpv5::open("document.hwp")?;
//!
//!     for event in file.section_events(0)? {
//!         if let TreeEvent::Start(Node::Text(run)) = event? {
//!             print!("{}", run.text);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Decoding is lazy and single-threaded: every stream is an iterator chain
//! that stops at its first error. [`ParseOptions`] chooses between the
//! merged tree (shaped paragraphs, inlined controls, matched fields and
//! table rows) and the raw record nesting, and whether a failing stream
//! aborts [`Hwp5File::all_events`] or is skipped.
//!
//! No logger is installed; diagnostics go through the [`log`] facade.

pub mod detect;
pub mod error;
pub mod hwp5;
pub mod model;
pub mod parse_options;

// Re-exports
pub use detect::{detect_format, detect_format_from_bytes, detect_format_from_path, FormatType};
pub use error::{Error, FieldDecodeError, ParseError, Result};
pub use hwp5::{Hwp5File, MemorySource, ModelType, StreamSource, TreeEvent};
pub use model::{Model, Node};
pub use parse_options::{ErrorMode, ParseOptions, TreeMode};

use std::path::Path;

/// Opens an HWP 5.0 document from a file path.
///
/// Other Hangul formats are detected and rejected with
/// [`Error::UnsupportedFormat`].
///
/// # Example
///
/// ```no_run
/// let file = hwpv5::open("example.hwp")?;
/// println!("HWP {}", file.header().version);
/// # Ok::<(), hwpv5::Error>(())
/// ```
pub fn open(path: impl AsRef<Path>) -> Result<Hwp5File> {
    let path = path.as_ref();
    match detect_format_from_path(path)? {
        FormatType::Hwp5 => Hwp5File::open(path),
        other => Err(Error::UnsupportedFormat(format!("{other} documents"))),
    }
}

/// Opens an HWP 5.0 document with custom options.
pub fn open_with_options(path: impl AsRef<Path>, options: ParseOptions) -> Result<Hwp5File> {
    Ok(open(path)?.with_options(options))
}

/// Opens an HWP 5.0 document held in memory.
pub fn parse_bytes(data: Vec<u8>) -> Result<Hwp5File> {
    detect::ensure_hwp5(&data)?;
    Hwp5File::from_bytes(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bytes_rejects_hwpx() {
        let data = vec![0x50, 0x4B, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            parse_bytes(data),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_parse_bytes_empty_data() {
        // Empty data should return InvalidData error (data too small)
        let result = parse_bytes(Vec::new());
        match result {
            Err(Error::InvalidData(_)) => {}
            _ => panic!("Expected InvalidData error for empty data"),
        }
    }

    #[test]
    fn test_ole_magic_without_container() {
        let mut data = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        data.resize(64, 0);
        assert!(matches!(
            parse_bytes(data),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_open_missing_file() {
        assert!(matches!(
            open("/nonexistent/document.hwp"),
            Err(Error::Io(_))
        ));
    }
}
