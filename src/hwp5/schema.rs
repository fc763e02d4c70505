//! Declarative field schemas and the payload decoder that walks them.
//!
//! Each model type declares an ordered list of [`FieldSpec`]s. Decoding
//! reads the fields in order from the record payload; a field newer than
//! the document version, or whose condition does not hold, is skipped
//! without consuming bytes.

use super::control::decode_para_text;
use super::header::Version;
use super::models::ModelType;
use crate::error::FieldDecodeError;
use crate::model::{Chid, Content, Value};
use bytes::Bytes;

/// How a single field is laid out in the payload.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    /// u16 length in code units followed by UTF-16LE text.
    Bstr,
    /// Four reversed ASCII bytes.
    Chid,
    /// Fixed number of raw bytes.
    Bytes(usize),
    /// Repeated items.
    Array(&'static FieldKind, Count),
    /// Nested group of fields.
    Struct(&'static [FieldSpec]),
    /// The rest of the payload as paragraph text chunks.
    ParaText,
}

/// Unsigned 32-bit length in 1/7200 inch.
pub const HWPUNIT: FieldKind = FieldKind::U32;
/// Signed 32-bit length in 1/7200 inch.
pub const SHWPUNIT: FieldKind = FieldKind::I32;
/// Signed 16-bit length in 1/7200 inch.
pub const HWPUNIT16: FieldKind = FieldKind::I16;
/// 0x00BBGGRR color.
pub const COLORREF: FieldKind = FieldKind::U32;

/// Width of a count prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    U16,
    U32,
    I16,
    I32,
}

/// Where an array takes its element count from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Fixed(usize),
    /// Count stored immediately before the items.
    Prefixed(Prefix),
    /// Count held by an already decoded sibling field.
    Field(&'static str),
    /// Count held by a field of the parent model.
    ParentField(&'static str),
}

/// Gate on a field's presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// `(sibling & mask) == value`
    Masked {
        field: &'static str,
        mask: u32,
        value: u32,
    },
    /// `(sibling & mask) != value`
    MaskedNot {
        field: &'static str,
        mask: u32,
        value: u32,
    },
    /// Any bit of `mask` set in a sibling field.
    FlagSet { field: &'static str, mask: u32 },
    /// The parent model has this type (or refines it).
    ParentIs(ModelType),
}

impl Condition {
    fn holds(&self, siblings: &Content, scope: &DecodeScope<'_>) -> bool {
        match *self {
            Condition::Masked { field, mask, value } => {
                siblings.get_u32(field).is_some_and(|v| v & mask == value)
            }
            Condition::MaskedNot { field, mask, value } => {
                siblings.get_u32(field).is_some_and(|v| v & mask != value)
            }
            Condition::FlagSet { field, mask } => {
                siblings.get_u32(field).is_some_and(|v| v & mask != 0)
            }
            Condition::ParentIs(ty) => scope.parent.is_some_and(|(parent, _)| parent.is_a(ty)),
        }
    }
}

/// One entry of a type's schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Oldest document version that stores this field.
    pub since: Option<Version>,
    pub when: Option<Condition>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            since: None,
            when: None,
        }
    }

    pub const fn since(self, version: Version) -> Self {
        Self {
            since: Some(version),
            ..self
        }
    }

    pub const fn when(self, condition: Condition) -> Self {
        Self {
            when: Some(condition),
            ..self
        }
    }
}

/// Shorthand used by the schema tables.
pub(crate) const fn f(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec::new(name, kind)
}

/// What the decoder may consult besides the payload itself.
#[derive(Debug, Clone, Copy)]
pub struct DecodeScope<'a> {
    pub version: Version,
    /// Type and content of the parent model, if any.
    pub parent: Option<(ModelType, &'a Content)>,
}

/// A field that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub offset: usize,
    pub kind: FieldDecodeError,
}

/// Cursor over one record payload.
pub struct Decoder<'a> {
    payload: &'a Bytes,
    pos: usize,
    scope: DecodeScope<'a>,
}

impl<'a> Decoder<'a> {
    pub fn new(payload: &'a Bytes, scope: DecodeScope<'a>) -> Self {
        Self {
            payload,
            pos: 0,
            scope,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.payload.len() - self.pos
    }

    /// Unconsumed tail of the payload, if any.
    pub fn unparsed(&self) -> Option<Bytes> {
        (self.remaining() > 0).then(|| self.payload.slice(self.pos..))
    }

    /// Decodes `fields` in order into `content`.
    pub fn decode_fields(
        &mut self,
        fields: &'static [FieldSpec],
        content: &mut Content,
    ) -> Result<(), FieldError> {
        for spec in fields {
            if spec.since.is_some_and(|since| self.scope.version < since) {
                continue;
            }
            if spec.when.is_some_and(|cond| !cond.holds(content, &self.scope)) {
                continue;
            }
            let value = self.read_kind(spec.name, &spec.kind, content)?;
            content.insert(spec.name, value);
        }
        Ok(())
    }

    fn read_kind(
        &mut self,
        name: &'static str,
        kind: &FieldKind,
        siblings: &Content,
    ) -> Result<Value, FieldError> {
        let offset = self.pos;
        let at = |kind: FieldDecodeError| FieldError {
            field: name,
            offset,
            kind,
        };

        let value = match *kind {
            FieldKind::U8 => Value::U8(self.take::<1>().map_err(at)?[0]),
            FieldKind::U16 => Value::U16(u16::from_le_bytes(self.take().map_err(at)?)),
            FieldKind::U32 => Value::U32(u32::from_le_bytes(self.take().map_err(at)?)),
            FieldKind::I8 => Value::I8(i8::from_le_bytes(self.take().map_err(at)?)),
            FieldKind::I16 => Value::I16(i16::from_le_bytes(self.take().map_err(at)?)),
            FieldKind::I32 => Value::I32(i32::from_le_bytes(self.take().map_err(at)?)),
            FieldKind::Bstr => {
                let len = u16::from_le_bytes(self.take().map_err(at)?) as usize;
                let raw = self.take_slice(len * 2).map_err(at)?;
                let units: Vec<u16> = raw
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                Value::Str(String::from_utf16_lossy(&units))
            }
            FieldKind::Chid => Value::Chid(Chid::from_stored(self.take().map_err(at)?)),
            FieldKind::Bytes(n) => Value::Bytes(self.take_slice(n).map_err(at)?),
            FieldKind::Array(item, count) => {
                let n = self.count(count, siblings).map_err(at)?;
                let mut items = Vec::with_capacity(n.min(self.remaining()));
                for _ in 0..n {
                    items.push(self.read_kind(name, item, siblings)?);
                }
                Value::Array(items)
            }
            FieldKind::Struct(fields) => {
                let mut inner = Content::new();
                self.decode_fields(fields, &mut inner)?;
                Value::Struct(inner)
            }
            FieldKind::ParaText => {
                let rest = self.payload.slice(self.pos..);
                let chunks = decode_para_text(&rest).map_err(at)?;
                self.pos = self.payload.len();
                Value::Text(chunks)
            }
        };
        Ok(value)
    }

    fn count(&mut self, count: Count, siblings: &Content) -> Result<usize, FieldDecodeError> {
        let n: i64 = match count {
            Count::Fixed(n) => return Ok(n),
            Count::Prefixed(Prefix::U16) => u16::from_le_bytes(self.take()?) as i64,
            Count::Prefixed(Prefix::U32) => u32::from_le_bytes(self.take()?) as i64,
            Count::Prefixed(Prefix::I16) => i16::from_le_bytes(self.take()?) as i64,
            Count::Prefixed(Prefix::I32) => i32::from_le_bytes(self.take()?) as i64,
            Count::Field(field) => siblings
                .get_i64(field)
                .ok_or(FieldDecodeError::MissingCount(field))?,
            Count::ParentField(field) => self
                .scope
                .parent
                .and_then(|(_, content)| content.get_i64(field))
                .ok_or(FieldDecodeError::MissingCount(field))?,
        };
        usize::try_from(n).map_err(|_| FieldDecodeError::NegativeCount(n))
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], FieldDecodeError> {
        let end = self.pos + N;
        let bytes = self
            .payload
            .get(self.pos..end)
            .ok_or(FieldDecodeError::Truncated {
                needed: N,
                available: self.remaining(),
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    fn take_slice(&mut self, n: usize) -> Result<Bytes, FieldDecodeError> {
        if n > self.remaining() {
            return Err(FieldDecodeError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = self.payload.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(slice)
    }
}
