//! Interval shaping of paragraph text.
//!
//! Character shapes and line segments are both stored as lists of start
//! positions. Each becomes a list of contiguous [`RangedShape`]s; text
//! chunks are then cut at every shape boundary so each piece carries exactly
//! one shape.

use crate::error::{Error, Result};
use crate::model::{split_utf16, utf16_len, ChunkContent, Span, TextChunk};
use std::iter::Peekable;

/// A value that applies to a half-open range of positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangedShape<T> {
    pub span: Span,
    pub value: T,
}

/// Turns `(start, value)` pairs into contiguous intervals. Each interval
/// ends where the next starts; the last one is open-ended.
pub fn make_ranged_shapes<T>(starts: impl IntoIterator<Item = (u32, T)>) -> Vec<RangedShape<T>> {
    let mut shapes: Vec<RangedShape<T>> = Vec::new();
    for (start, value) in starts {
        if let Some(prev) = shapes.last_mut() {
            prev.span.end = start;
        }
        shapes.push(RangedShape {
            span: Span::new(start, u32::MAX),
            value,
        });
    }
    shapes
}

/// A positioned piece of content that may be cut in two.
pub trait SplitChunk: Sized {
    fn span(&self) -> Span;

    /// Cuts at absolute position `at`, strictly inside the span. Returns
    /// the chunk unchanged when it cannot be cut there.
    fn split_at(self, at: u32) -> std::result::Result<(Self, Self), Self>;
}

impl SplitChunk for TextChunk {
    fn span(&self) -> Span {
        self.span
    }

    fn split_at(self, at: u32) -> std::result::Result<(Self, Self), Self> {
        if at <= self.span.start || at >= self.span.end {
            return Err(self);
        }
        let text = match self.content {
            ChunkContent::Text(text) => text,
            control @ ChunkContent::Control(_) => {
                return Err(TextChunk {
                    span: self.span,
                    content: control,
                })
            }
        };

        let (head, tail) = split_utf16(text, at - self.span.start);
        if head.is_empty() || tail.is_empty() {
            let mut whole = head;
            whole.push_str(&tail);
            return Err(TextChunk {
                span: self.span,
                content: ChunkContent::Text(whole),
            });
        }
        let mid = self.span.start + utf16_len(&head);
        Ok((
            TextChunk {
                span: Span::new(self.span.start, mid),
                content: ChunkContent::Text(head),
            },
            TextChunk {
                span: Span::new(mid, self.span.end),
                content: ChunkContent::Text(tail),
            },
        ))
    }
}

/// A chunk already tagged with a shape keeps that tag on both halves.
impl<C: SplitChunk, T: Clone> SplitChunk for (C, T) {
    fn span(&self) -> Span {
        self.0.span()
    }

    fn split_at(self, at: u32) -> std::result::Result<(Self, Self), Self> {
        let (chunk, tag) = self;
        match chunk.split_at(at) {
            Ok((head, tail)) => Ok(((head, tag.clone()), (tail, tag))),
            Err(whole) => Err((whole, tag)),
        }
    }
}

/// Lazy pairing of chunks with the shapes covering them.
pub struct SplitShaped<I, C, T> {
    chunks: I,
    shapes: Vec<RangedShape<T>>,
    index: usize,
    pending: Option<C>,
    done: bool,
}

/// Cuts `chunks` at every shape boundary and tags each piece with its shape.
///
/// A chunk that cannot be cut keeps the shape in effect at its start. A
/// position no shape covers is an error.
pub fn split_and_shape<I, C, T>(chunks: I, shapes: Vec<RangedShape<T>>) -> SplitShaped<I::IntoIter, C, T>
where
    I: IntoIterator<Item = C>,
    C: SplitChunk,
    T: Clone,
{
    SplitShaped {
        chunks: chunks.into_iter(),
        shapes,
        index: 0,
        pending: None,
        done: false,
    }
}

impl<I, C, T> Iterator for SplitShaped<I, C, T>
where
    I: Iterator<Item = C>,
    C: SplitChunk,
    T: Clone,
{
    type Item = Result<(C, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let chunk = self.pending.take().or_else(|| self.chunks.next())?;
        let span = chunk.span();

        while self
            .shapes
            .get(self.index)
            .is_some_and(|shape| shape.span.end <= span.start && !span.is_empty())
        {
            self.index += 1;
        }

        let shape = match self.shapes.get(self.index) {
            Some(shape) if shape.span.start <= span.start => shape,
            _ => {
                self.done = true;
                return Some(Err(Error::InvalidData(format!(
                    "no shape covers position {}",
                    span.start
                ))));
            }
        };

        let value = shape.value.clone();
        if span.end <= shape.span.end {
            return Some(Ok((chunk, value)));
        }
        match chunk.split_at(shape.span.end) {
            Ok((head, tail)) => {
                self.pending = Some(tail);
                Some(Ok((head, value)))
            }
            Err(whole) => Some(Ok((whole, value))),
        }
    }
}

/// Chunks of one line, with the line's value and its index among the lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<L, C> {
    pub index: usize,
    pub value: L,
    pub chunks: Vec<C>,
}

/// Lazy grouping of chunks into lines.
pub struct LineSegmented<I, C, L>
where
    I: Iterator<Item = C>,
    C: SplitChunk,
    L: Clone,
{
    inner: Peekable<SplitShaped<I, C, (usize, L)>>,
}

/// Cuts chunks at line boundaries and groups them per line, in order.
/// Lines that receive no chunk are skipped.
pub fn line_segmented<I, C, L>(chunks: I, lines: Vec<RangedShape<L>>) -> LineSegmented<I::IntoIter, C, L>
where
    I: IntoIterator<Item = C>,
    C: SplitChunk,
    L: Clone,
{
    let indexed = lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| RangedShape {
            span: line.span,
            value: (index, line.value),
        })
        .collect();
    LineSegmented {
        inner: split_and_shape(chunks, indexed).peekable(),
    }
}

impl<I, C, L> Iterator for LineSegmented<I, C, L>
where
    I: Iterator<Item = C>,
    C: SplitChunk,
    L: Clone,
{
    type Item = Result<Line<L, C>>;

    fn next(&mut self) -> Option<Self::Item> {
        let (first, (index, value)) = match self.inner.next()? {
            Ok(item) => item,
            Err(e) => return Some(Err(e)),
        };
        let mut chunks = vec![first];
        while let Some(Ok((_, (next_index, _)))) = self.inner.peek() {
            if *next_index != index {
                break;
            }
            if let Some(Ok((chunk, _))) = self.inner.next() {
                chunks.push(chunk);
            }
        }
        Some(Ok(Line {
            index,
            value,
            chunks,
        }))
    }
}
