//! Paragraph text units.
//!
//! Positions are counted in UTF-16 code units, the unit HWP uses for
//! character-shape and line-segment offsets.

use super::value::Chid;
use bytes::Bytes;
use serde::Serialize;

/// A half-open range `[start, end)` of UTF-16 positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Returns true if `self` lies entirely within `other`.
    pub fn within(&self, other: &Span) -> bool {
        other.start <= self.start && self.end <= other.end
    }
}

/// How many code units a control character occupies and what it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ControlKind {
    /// A single code unit (line break, paragraph break, ...).
    Char,
    /// Eight code units carrying inline parameters (tab, field end, ...).
    Inline,
    /// Eight code units referring to a control record stored as a sibling.
    Extended,
}

impl ControlKind {
    /// Number of UTF-16 code units occupied in the text stream.
    pub fn width(self) -> u32 {
        match self {
            ControlKind::Char => 1,
            ControlKind::Inline | ControlKind::Extended => 8,
        }
    }
}

/// A control character embedded in paragraph text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlChar {
    pub code: u16,
    pub kind: ControlKind,
    /// Referenced control id, for extended controls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chid: Option<Chid>,
    /// Raw parameter bytes, for inline and extended controls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<Bytes>,
}

impl ControlChar {
    /// Returns the conventional name of this control code.
    pub fn name(&self) -> &'static str {
        crate::hwp5::control::control_char_name(self.code)
    }
}

/// The payload of one text chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChunkContent {
    Text(String),
    Control(ControlChar),
}

impl ChunkContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ChunkContent::Text(s) => Some(s),
            ChunkContent::Control(_) => None,
        }
    }

    pub fn as_control(&self) -> Option<&ControlChar> {
        match self {
            ChunkContent::Control(c) => Some(c),
            ChunkContent::Text(_) => None,
        }
    }
}

/// A run of plain text or a single control character with its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    pub span: Span,
    pub content: ChunkContent,
}

/// Splits a string after `at` UTF-16 code units.
///
/// A split point inside a surrogate pair moves past the pair.
pub fn split_utf16(mut text: String, at: u32) -> (String, String) {
    let mut units = 0u32;
    let mut byte_index = text.len();
    for (index, ch) in text.char_indices() {
        if units >= at {
            byte_index = index;
            break;
        }
        units += ch.len_utf16() as u32;
    }
    let tail = text.split_off(byte_index);
    (text, tail)
}

/// Counts UTF-16 code units in a string.
pub fn utf16_len(text: &str) -> u32 {
    text.chars().map(|c| c.len_utf16() as u32).sum()
}
