//! Control identifiers and paragraph text decoding.

use crate::error::FieldDecodeError;
use crate::model::{Chid, ChunkContent, ControlChar, ControlKind, Span, TextChunk};
use bytes::Bytes;
use log::warn;

/// Control identifiers found in CTRL_HEADER records.
pub mod chid {
    use crate::model::Chid;

    /// Section definition
    pub const SECD: Chid = Chid::new(*b"secd");
    /// Column definition
    pub const COLD: Chid = Chid::new(*b"cold");
    /// Table
    pub const TBL: Chid = Chid::new(*b"tbl ");
    /// Generic drawing object
    pub const GSO: Chid = Chid::new(*b"gso ");
    /// Equation editor
    pub const EQED: Chid = Chid::new(*b"eqed");
    /// Header
    pub const HEADER: Chid = Chid::new(*b"head");
    /// Footer
    pub const FOOTER: Chid = Chid::new(*b"foot");
    /// Footnote
    pub const FN: Chid = Chid::new(*b"fn  ");
    /// Endnote
    pub const EN: Chid = Chid::new(*b"en  ");
    /// Auto number
    pub const ATNO: Chid = Chid::new(*b"atno");
    /// New number
    pub const NWNO: Chid = Chid::new(*b"nwno");
    /// Hide page decorations
    pub const PGHD: Chid = Chid::new(*b"pghd");
    /// Odd/even page adjustment
    pub const PGCT: Chid = Chid::new(*b"pgct");
    /// Page number position
    pub const PGNP: Chid = Chid::new(*b"pgnp");
    /// Index marker
    pub const IDXM: Chid = Chid::new(*b"idxm");
    /// Bookmark
    pub const BOKM: Chid = Chid::new(*b"bokm");
    /// Overlapping characters
    pub const TCPS: Chid = Chid::new(*b"tcps");
    /// Dutmal (ruby text)
    pub const TDUT: Chid = Chid::new(*b"tdut");
    /// Hidden comment
    pub const TCMT: Chid = Chid::new(*b"tcmt");

    pub const FIELD_UNKNOWN: Chid = Chid::new(*b"%unk");
    pub const FIELD_DATE: Chid = Chid::new(*b"%dte");
    pub const FIELD_DOCDATE: Chid = Chid::new(*b"%ddt");
    pub const FIELD_PATH: Chid = Chid::new(*b"%pat");
    pub const FIELD_BOOKMARK: Chid = Chid::new(*b"%bmk");
    pub const FIELD_MAILMERGE: Chid = Chid::new(*b"%mmg");
    pub const FIELD_CROSSREF: Chid = Chid::new(*b"%xrf");
    pub const FIELD_FORMULA: Chid = Chid::new(*b"%fmu");
    pub const FIELD_CLICKHERE: Chid = Chid::new(*b"%clk");
    pub const FIELD_SUMMARY: Chid = Chid::new(*b"%smr");
    pub const FIELD_USERINFO: Chid = Chid::new(*b"%usr");
    pub const FIELD_HYPERLINK: Chid = Chid::new(*b"%hlk");
    pub const FIELD_REVISION_SIGN: Chid = Chid::new(*b"%sig");
    pub const FIELD_MEMO: Chid = Chid::new(*b"%%me");
    pub const FIELD_TOC: Chid = Chid::new(*b"%toc");
}

/// Control character codes used in PARA_TEXT.
pub mod code {
    pub const SECTION_COLUMN_DEF: u16 = 0x0002;
    pub const FIELD_START: u16 = 0x0003;
    pub const FIELD_END: u16 = 0x0004;
    pub const TITLE_MARK: u16 = 0x0008;
    pub const TAB: u16 = 0x0009;
    pub const LINE_BREAK: u16 = 0x000A;
    pub const DRAWING_TABLE_OBJECT: u16 = 0x000B;
    pub const PARAGRAPH_BREAK: u16 = 0x000D;
    pub const HIDDEN_EXPLANATION: u16 = 0x000F;
    pub const HEADER_FOOTER: u16 = 0x0010;
    pub const FOOT_END_NOTE: u16 = 0x0011;
    pub const AUTO_NUMBER: u16 = 0x0012;
    pub const PAGE_CTLCHR: u16 = 0x0015;
    pub const BOOKMARK: u16 = 0x0016;
    pub const HYPHEN: u16 = 0x0018;
    pub const NONBREAK_SPACE: u16 = 0x001E;
    pub const FIXWIDTH_SPACE: u16 = 0x001F;
}

/// Classifies a code unit below 0x20.
pub fn control_kind(code: u16) -> Option<ControlKind> {
    match code {
        0 | 10 | 13 | 24..=31 => Some(ControlKind::Char),
        4..=9 | 19 | 20 => Some(ControlKind::Inline),
        1..=3 | 11 | 12 | 14..=18 | 21..=23 => Some(ControlKind::Extended),
        _ => None,
    }
}

/// Conventional name of a control character code.
pub fn control_char_name(code: u16) -> &'static str {
    match code {
        0x00 => "NULL",
        0x01 => "CTLCHR01",
        code::SECTION_COLUMN_DEF => "SECTION_COLUMN_DEF",
        code::FIELD_START => "FIELD_START",
        code::FIELD_END => "FIELD_END",
        0x05 => "CTLCHR05",
        0x06 => "CTLCHR06",
        0x07 => "CTLCHR07",
        code::TITLE_MARK => "TITLE_MARK",
        code::TAB => "TAB",
        code::LINE_BREAK => "LINE_BREAK",
        code::DRAWING_TABLE_OBJECT => "DRAWING_TABLE_OBJECT",
        0x0C => "CTLCHR0C",
        code::PARAGRAPH_BREAK => "PARAGRAPH_BREAK",
        0x0E => "CTLCHR0E",
        code::HIDDEN_EXPLANATION => "HIDDEN_EXPLANATION",
        code::HEADER_FOOTER => "HEADER_FOOTER",
        code::FOOT_END_NOTE => "FOOT_END_NOTE",
        code::AUTO_NUMBER => "AUTO_NUMBER",
        0x13 => "CTLCHR13",
        0x14 => "CTLCHR14",
        code::PAGE_CTLCHR => "PAGE_CTLCHR",
        code::BOOKMARK => "BOOKMARK",
        0x17 => "CTLCHR17",
        code::HYPHEN => "HYPHEN",
        0x19..=0x1D => "RESERVED",
        code::NONBREAK_SPACE => "NONBREAK_SPACE",
        code::FIXWIDTH_SPACE => "FIXWIDTH_SPACE",
        _ => "UNKNOWN",
    }
}

/// Decodes a PARA_TEXT payload into text runs and control characters.
///
/// Positions are UTF-16 code unit offsets from the start of the paragraph.
pub fn decode_para_text(data: &Bytes) -> Result<Vec<TextChunk>, FieldDecodeError> {
    if !data.len().is_multiple_of(2) {
        return Err(FieldDecodeError::Truncated {
            needed: data.len() + 1,
            available: data.len(),
        });
    }

    let unit_count = (data.len() / 2) as u32;
    let unit_at = |i: u32| {
        let at = i as usize * 2;
        u16::from_le_bytes([data[at], data[at + 1]])
    };

    let mut chunks = Vec::new();
    let mut text: Vec<u16> = Vec::new();
    let mut text_start = 0u32;
    let mut pos = 0u32;

    while pos < unit_count {
        let unit = unit_at(pos);
        let Some(kind) = control_kind(unit) else {
            if text.is_empty() {
                text_start = pos;
            }
            text.push(unit);
            pos += 1;
            continue;
        };

        if !text.is_empty() {
            chunks.push(TextChunk {
                span: Span::new(text_start, pos),
                content: ChunkContent::Text(String::from_utf16_lossy(&text)),
            });
            text.clear();
        }

        let width = kind.width();
        if pos + width > unit_count {
            return Err(FieldDecodeError::Truncated {
                needed: width as usize * 2,
                available: (unit_count - pos) as usize * 2,
            });
        }

        let control = match kind {
            ControlKind::Char => ControlChar {
                code: unit,
                kind,
                chid: None,
                param: None,
            },
            ControlKind::Inline | ControlKind::Extended => {
                let closing = unit_at(pos + 7);
                if closing != unit {
                    warn!(
                        "control character {:#06x} at {} closes with {:#06x}",
                        unit, pos, closing
                    );
                }
                let body = pos as usize * 2 + 2;
                if kind == ControlKind::Extended {
                    let stored = [data[body], data[body + 1], data[body + 2], data[body + 3]];
                    ControlChar {
                        code: unit,
                        kind,
                        chid: Some(Chid::from_stored(stored)),
                        param: Some(data.slice(body + 4..body + 12)),
                    }
                } else {
                    ControlChar {
                        code: unit,
                        kind,
                        chid: None,
                        param: Some(data.slice(body..body + 12)),
                    }
                }
            }
        };

        chunks.push(TextChunk {
            span: Span::new(pos, pos + width),
            content: ChunkContent::Control(control),
        });
        pos += width;
    }

    if !text.is_empty() {
        chunks.push(TextChunk {
            span: Span::new(text_start, pos),
            content: ChunkContent::Text(String::from_utf16_lossy(&text)),
        });
    }
    Ok(chunks)
}
