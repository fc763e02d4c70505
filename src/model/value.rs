//! Decoded field values.

use super::text::TextChunk;
use bytes::Bytes;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// A four-character control identifier such as `tbl ` or `%hlk`.
///
/// Stored in the record payload with its bytes reversed; held here in
/// reading order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Chid([u8; 4]);

impl Chid {
    /// Creates a chid from its reading-order bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Creates a chid from the byte order used on disk.
    pub const fn from_stored(bytes: [u8; 4]) -> Self {
        Self([bytes[3], bytes[2], bytes[1], bytes[0]])
    }

    /// Returns the on-disk byte order.
    pub const fn to_stored(self) -> [u8; 4] {
        [self.0[3], self.0[2], self.0[1], self.0[0]]
    }

    /// Returns the reading-order bytes.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Returns true for field controls (`%xxx`).
    pub fn is_field(&self) -> bool {
        self.0[0] == b'%'
    }
}

impl fmt::Display for Chid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Chid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chid({:?})", self.to_string())
    }
}

impl Serialize for Chid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single decoded field value.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    I16(i16),
    I32(i32),
    Str(String),
    Chid(Chid),
    Bytes(Bytes),
    Array(Vec<Value>),
    Struct(Content),
    /// Paragraph text split into text runs and control characters.
    Text(Vec<TextChunk>),
}

impl Value {
    /// Returns the value as an unsigned integer, if it is a non-negative integer.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::U8(v) => Some(v as u32),
            Value::U16(v) => Some(v as u32),
            Value::U32(v) => Some(v),
            Value::I8(v) => u32::try_from(v).ok(),
            Value::I16(v) => u32::try_from(v).ok(),
            Value::I32(v) => u32::try_from(v).ok(),
            _ => None,
        }
    }

    /// Returns the value as a signed integer, if it is any integer.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::U8(v) => Some(v as i64),
            Value::U16(v) => Some(v as i64),
            Value::U32(v) => Some(v as i64),
            Value::I8(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_chid(&self) -> Option<Chid> {
        match self {
            Value::Chid(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Content> {
        match self {
            Value::Struct(content) => Some(content),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[TextChunk]> {
        match self {
            Value::Text(chunks) => Some(chunks),
            _ => None,
        }
    }
}

/// Ordered field values of one model (or one nested struct).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    fields: Vec<(&'static str, Value)>,
}

impl Content {
    /// Creates an empty content map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value of a field.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Sets a field, replacing an existing value of the same name in place.
    pub fn insert(&mut self, name: &'static str, value: Value) {
        match self.get_mut(name) {
            Some(slot) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Moves every field of `other` into `self`.
    pub fn extend(&mut self, other: Content) {
        for (name, value) in other.fields {
            self.insert(name, value);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in decode order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    pub fn get_u32(&self, name: &str) -> Option<u32> {
        self.get(name).and_then(Value::as_u32)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_chid(&self, name: &str) -> Option<Chid> {
        self.get(name).and_then(Value::as_chid)
    }

    pub fn get_array(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_array)
    }

    pub fn get_struct(&self, name: &str) -> Option<&Content> {
        self.get(name).and_then(Value::as_struct)
    }
}

impl FromIterator<(&'static str, Value)> for Content {
    fn from_iter<I: IntoIterator<Item = (&'static str, Value)>>(iter: I) -> Self {
        let mut content = Content::new();
        for (name, value) in iter {
            content.insert(name, value);
        }
        content
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
