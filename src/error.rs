//! Error types for the hwpv5 library.

use std::io;
use thiserror::Error;

/// Result type alias for hwpv5 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the hwpv5 library.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file or stream operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not supported (e.g., HWP 3.x or a newer major version).
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The document is password protected and cannot be parsed.
    #[error("Document is encrypted")]
    Encrypted,

    /// The document is a distribution document and no decryptor was supplied.
    #[error("Document is a restricted distribution document")]
    DistributionRestricted,

    /// Decompression error.
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// The stream ended in the middle of a record.
    #[error("Truncated stream at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedStream {
        offset: u64,
        needed: usize,
        available: usize,
    },

    /// A record level skips an intermediate nesting level.
    #[error("Structure error: level {level} (baseline {baseline}) cannot open below depth {depth}")]
    Structure { level: u16, baseline: u16, depth: usize },

    /// A schema field could not be decoded from a record payload.
    #[error(transparent)]
    Parse(Box<ParseError>),

    /// Two refinements were registered for the same extension key.
    #[error("Ambiguous extension for {base}: {key}")]
    AmbiguousExtension { base: &'static str, key: String },

    /// Invalid or malformed data.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Required stream or storage is missing.
    #[error("Missing required component: {0}")]
    MissingComponent(String),

    /// Text encoding error.
    #[error("Text encoding error: {0}")]
    Encoding(String),
}

/// Diagnostics for a field that failed to decode.
#[derive(Error, Debug)]
#[error("{type_name}.{field}: {kind} (byte {offset} of record #{seqno}, path {path})")]
pub struct ParseError {
    /// Name of the model type being decoded.
    pub type_name: &'static str,
    /// Name of the offending field.
    pub field: &'static str,
    /// Byte offset within the record payload.
    pub offset: usize,
    /// Sequence number of the record within its stream.
    pub seqno: u32,
    /// Ancestor path, e.g. `Paragraph#0/TableControl#3`.
    pub path: String,
    /// Underlying decode failure.
    #[source]
    pub kind: FieldDecodeError,
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(Box::new(err))
    }
}

/// Reasons a single field read can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldDecodeError {
    /// Fewer payload bytes remain than the field needs.
    #[error("needed {needed} bytes but only {available} remain")]
    Truncated { needed: usize, available: usize },

    /// An array count refers to a field that is absent or not an integer.
    #[error("count field `{0}` is missing or not an integer")]
    MissingCount(&'static str),

    /// A signed count prefix was negative.
    #[error("negative element count {0}")]
    NegativeCount(i64),
}

impl From<std::string::FromUtf16Error> for Error {
    fn from(err: std::string::FromUtf16Error) -> Self {
        Error::Encoding(err.to_string())
    }
}
