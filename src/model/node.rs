//! Decoded record models and the nodes of the output event tree.

use super::text::{ControlChar, Span};
use super::value::Content;
use crate::hwp5::ModelType;
use bytes::Bytes;
use serde::Serialize;
use std::rc::Rc;

/// A decoded record: its resolved type and field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    /// Raw tag id of the record.
    pub tag_id: u16,
    /// Raw nesting level of the record.
    pub level: u16,
    /// Position of the record within its stream.
    pub seqno: u32,
    /// Base type of the tag, or the refinement chosen for its context.
    #[serde(rename = "type")]
    pub model_type: ModelType,
    /// Decoded fields, base fields first.
    pub content: Content,
    /// Payload bytes no schema field consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unparsed: Option<Bytes>,
}

impl Model {
    /// Returns true if the model's type is `ty` or refines it.
    pub fn is_a(&self, ty: ModelType) -> bool {
        self.model_type.is_a(ty)
    }
}

/// One line segment of a shaped paragraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeg {
    /// Index of the segment within its paragraph's ParaLineSeg record.
    pub index: usize,
    /// Layout fields (`chpos`, `y`, `height`, ...).
    pub content: Content,
    /// True when the paragraph had no line segment record.
    pub synthetic: bool,
}

/// A text run with a single character shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRun {
    pub span: Span,
    /// Character shape id, `None` when the paragraph carries no shape for it.
    pub charshape_id: Option<u32>,
    pub text: String,
}

/// A control character placed in a line, with its character shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlCharRun {
    pub span: Span,
    pub charshape_id: Option<u32>,
    pub control: ControlChar,
}

/// Synthetic wrapper around the cells of one table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub index: usize,
}

/// An item of the output event tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// A record model.
    Model(Rc<Model>),
    /// Synthetic line segment of a paragraph.
    LineSeg(Rc<LineSeg>),
    /// Synthetic text run.
    Text(Rc<TextRun>),
    /// Synthetic control character.
    ControlChar(Rc<ControlCharRun>),
    /// Synthetic table row.
    TableRow(TableRow),
}

impl Node {
    pub fn as_model(&self) -> Option<&Rc<Model>> {
        match self {
            Node::Model(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the model type for model nodes.
    pub fn model_type(&self) -> Option<ModelType> {
        self.as_model().map(|m| m.model_type)
    }

    /// Returns true for model nodes whose type is `ty` or refines it.
    pub fn is_model(&self, ty: ModelType) -> bool {
        self.as_model().is_some_and(|m| m.is_a(ty))
    }

    /// Returns true if both nodes refer to the same shared item.
    pub fn same_as(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Model(a), Node::Model(b)) => Rc::ptr_eq(a, b),
            (Node::LineSeg(a), Node::LineSeg(b)) => Rc::ptr_eq(a, b),
            (Node::Text(a), Node::Text(b)) => Rc::ptr_eq(a, b),
            (Node::ControlChar(a), Node::ControlChar(b)) => Rc::ptr_eq(a, b),
            (Node::TableRow(a), Node::TableRow(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Rc<Model>> for Node {
    fn from(model: Rc<Model>) -> Self {
        Node::Model(model)
    }
}
