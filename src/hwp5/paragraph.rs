//! Paragraph shaping.
//!
//! A paragraph record stores its text, character-shape positions and line
//! layout as separate children, and the controls it embeds as further
//! siblings. This stage rebuilds each paragraph as a list of lines holding
//! shaped text runs, with every control subtree placed where its
//! placeholder character sits in the text.

use super::models::ModelType;
use super::shape::{line_segmented, make_ranged_shapes, split_and_shape};
use super::tree::{TreeEvent, TreeNode};
use super::views::{text_chunks, CharShapePos, LineSegView};
use crate::error::Result;
use crate::model::{
    ChunkContent, Content, ControlCharRun, ControlKind, LineSeg, Node, Span, TextChunk, TextRun,
};
use log::{debug, warn};
use std::collections::VecDeque;
use std::rc::Rc;

/// Event stage that replaces every paragraph subtree with its shaped form.
pub struct ShapeParagraphs<I> {
    inner: I,
    pending: VecDeque<TreeEvent<Node>>,
    done: bool,
}

pub fn shape_paragraphs<I>(events: I) -> ShapeParagraphs<I::IntoIter>
where
    I: IntoIterator<Item = Result<TreeEvent<Node>>>,
{
    ShapeParagraphs {
        inner: events.into_iter(),
        pending: VecDeque::new(),
        done: false,
    }
}

impl<I> Iterator for ShapeParagraphs<I>
where
    I: Iterator<Item = Result<TreeEvent<Node>>>,
{
    type Item = Result<TreeEvent<Node>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }
            match self.inner.next() {
                Some(Ok(TreeEvent::Start(node))) if node.is_model(ModelType::Paragraph) => {
                    match TreeNode::collect(node, &mut self.inner).and_then(shape_tree) {
                        Ok(tree) => tree.flatten_into(&mut self.pending),
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(event) => return Some(event),
                None => {
                    self.done = true;
                }
            }
        }
    }
}

/// Shapes every paragraph in a subtree, innermost first.
fn shape_tree(mut tree: TreeNode<Node>) -> Result<TreeNode<Node>> {
    tree.children = tree
        .children
        .into_iter()
        .map(shape_tree)
        .collect::<Result<_>>()?;
    if tree.item.is_model(ModelType::Paragraph) {
        shape_paragraph(tree)
    } else {
        Ok(tree)
    }
}

/// Record children of one paragraph, sorted by role.
#[derive(Default)]
struct ParagraphParts {
    chunks: Vec<TextChunk>,
    charshapes: Vec<CharShapePos>,
    linesegs: Vec<LineSegView>,
    controls: VecDeque<TreeNode<Node>>,
    others: Vec<TreeNode<Node>>,
}

impl ParagraphParts {
    fn sort(children: Vec<TreeNode<Node>>) -> Result<Self> {
        let mut parts = Self::default();
        for child in children {
            let Some(model) = child.item.as_model() else {
                parts.others.push(child);
                continue;
            };
            match model.model_type {
                ModelType::ParaText => parts.chunks.extend(text_chunks(model)?.iter().cloned()),
                ModelType::ParaCharShape => parts.charshapes = CharShapePos::list(model)?,
                ModelType::ParaLineSeg => parts.linesegs = LineSegView::list(model)?,
                _ if model.is_a(ModelType::Control) => parts.controls.push_back(child),
                _ => parts.others.push(child),
            }
        }
        // Paragraphs without text still get their shape and line
        if parts.chunks.is_empty() {
            parts.chunks.push(TextChunk {
                span: Span::new(0, 0),
                content: ChunkContent::Text(String::new()),
            });
        }
        Ok(parts)
    }
}

fn shape_paragraph(tree: TreeNode<Node>) -> Result<TreeNode<Node>> {
    let TreeNode { item, children } = tree;
    let ParagraphParts {
        chunks,
        charshapes,
        linesegs,
        mut controls,
        others,
    } = ParagraphParts::sort(children)?;

    let mut shape_starts: Vec<(u32, Option<u32>)> = charshapes
        .into_iter()
        .map(|shape| (shape.pos, Some(shape.charshape_id)))
        .collect();
    if shape_starts.first().map_or(true, |&(pos, _)| pos > 0) {
        shape_starts.insert(0, (0, None));
    }

    let line_starts: Vec<(u32, Rc<LineSeg>)> = if linesegs.is_empty() {
        vec![(
            0,
            Rc::new(LineSeg {
                index: 0,
                content: Content::new(),
                synthetic: true,
            }),
        )]
    } else {
        linesegs
            .into_iter()
            .enumerate()
            .map(|(index, view)| {
                // The first line always starts the paragraph
                let start = match index {
                    0 => 0,
                    _ => view.chpos,
                };
                let line = LineSeg {
                    index,
                    content: view.content,
                    synthetic: false,
                };
                (start, Rc::new(line))
            })
            .collect()
    };

    let shaped: Vec<(TextChunk, Option<u32>)> =
        split_and_shape(chunks, make_ranged_shapes(shape_starts)).collect::<Result<_>>()?;

    let mut out = others;
    for line in line_segmented(shaped, make_ranged_shapes(line_starts)) {
        let line = line?;
        let mut runs = Vec::with_capacity(line.chunks.len());
        for (chunk, charshape_id) in line.chunks {
            let control = match chunk.content {
                ChunkContent::Text(text) => {
                    runs.push(TreeNode::new(Node::Text(Rc::new(TextRun {
                        span: chunk.span,
                        charshape_id,
                        text,
                    }))));
                    continue;
                }
                ChunkContent::Control(control) => control,
            };

            if control.kind == ControlKind::Extended {
                if let Some(subtree) = controls.pop_front() {
                    let stored = subtree
                        .item
                        .as_model()
                        .and_then(|m| m.content.get_chid("chid"));
                    if stored != control.chid {
                        warn!(
                            "control at {} refers to {:?} but the next control record is {:?}",
                            chunk.span.start, control.chid, stored
                        );
                    }
                    runs.push(subtree);
                    continue;
                }
                warn!(
                    "no control record left for {} at {}",
                    control.name(),
                    chunk.span.start
                );
            }
            runs.push(TreeNode::new(Node::ControlChar(Rc::new(ControlCharRun {
                span: chunk.span,
                charshape_id,
                control,
            }))));
        }
        out.push(TreeNode {
            item: Node::LineSeg(line.value),
            children: runs,
        });
    }

    if !controls.is_empty() {
        debug!(
            "{} control records without a placeholder, appending",
            controls.len()
        );
        out.extend(controls);
    }

    Ok(TreeNode {
        item,
        children: out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwp5::control::{chid, code};
    use crate::hwp5::record::TagId;
    use crate::hwp5::testutil::*;

    fn shaped(records: Vec<(TagId, u16, Vec<u8>)>) -> Vec<TreeEvent<Node>> {
        shape_paragraphs(model_events(numbered(records)))
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_lines_and_inlined_control() {
        let mut text = units("ab");
        text.extend(extended(code::DRAWING_TABLE_OBJECT, chid::TBL));
        text.extend(units("cd\r"));

        let events = shaped(vec![
            (TagId::ParaHeader, 0, para_header(2, 2)),
            (TagId::ParaText, 1, text),
            (TagId::ParaCharShape, 1, char_shapes(&[(0, 5), (11, 6)])),
            (TagId::ParaLineSeg, 1, line_segs(&[0, 10])),
            (TagId::CtrlHeader, 1, control_payload(chid::TBL, COMMON_CONTROL_LEN)),
        ]);

        assert_eq!(
            render(&events),
            "<Paragraph><LineSeg>'ab'<TableControl/></LineSeg>\
             <LineSeg>'c''d'<PARAGRAPH_BREAK/></LineSeg></Paragraph>"
        );

        let runs: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TreeEvent::Start(Node::Text(run)) => Some((run.text.as_str(), run.charshape_id)),
                _ => None,
            })
            .collect();
        assert_eq!(runs, vec![("ab", Some(5)), ("c", Some(5)), ("d", Some(6))]);

        let TreeEvent::Start(Node::LineSeg(second)) = &events[7] else {
            panic!("expected the second line, got {:?}", events[7]);
        };
        assert_eq!(second.index, 1);
        assert_eq!(second.content.get_u32("chpos"), Some(10));
        assert!(!second.synthetic);
    }

    #[test]
    fn test_missing_layout_records() {
        let events = shaped(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, units("hi\r")),
        ]);
        assert_eq!(
            render(&events),
            "<Paragraph><LineSeg>'hi'<PARAGRAPH_BREAK/></LineSeg></Paragraph>"
        );

        let line = events.iter().find_map(|e| match e {
            TreeEvent::Start(Node::LineSeg(line)) => Some(line.clone()),
            _ => None,
        });
        assert!(line.is_some_and(|l| l.synthetic));

        let first_run = events.iter().find_map(|e| match e {
            TreeEvent::Start(Node::Text(run)) => Some(run.charshape_id),
            _ => None,
        });
        assert_eq!(first_run, Some(None));
    }

    #[test]
    fn test_gap_before_first_char_shape() {
        let events = shaped(vec![
            (TagId::ParaHeader, 0, para_header(1, 0)),
            (TagId::ParaText, 1, units("abcd")),
            (TagId::ParaCharShape, 1, char_shapes(&[(2, 9)])),
        ]);
        let ids: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TreeEvent::Start(Node::Text(run)) => Some((run.text.clone(), run.charshape_id)),
                _ => None,
            })
            .collect();
        assert_eq!(
            ids,
            vec![("ab".to_string(), None), ("cd".to_string(), Some(9))]
        );
    }

    #[test]
    fn test_leftover_controls_are_appended() {
        let events = shaped(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, units("x")),
            (TagId::CtrlHeader, 1, control_payload(chid::SECD, 30)),
            (TagId::PageDef, 2, vec![0; 40]),
            (TagId::ParaHeader, 0, para_header(0, 0)),
        ]);
        assert_eq!(
            render(&events),
            "<Paragraph><LineSeg>'x'</LineSeg><SectionDef><PageDef/></SectionDef></Paragraph>\
             <Paragraph><LineSeg>''</LineSeg></Paragraph>"
        );
    }

    #[test]
    fn test_paragraph_without_text_keeps_layout() {
        let events = shaped(vec![
            (TagId::ParaHeader, 0, para_header(1, 1)),
            (TagId::ParaCharShape, 1, char_shapes(&[(0, 7)])),
            (TagId::ParaLineSeg, 1, line_segs(&[0])),
        ]);
        assert_eq!(
            render(&events),
            "<Paragraph><LineSeg>''</LineSeg></Paragraph>"
        );

        let TreeEvent::Start(Node::LineSeg(line)) = &events[1] else {
            panic!("expected a line, got {:?}", events[1]);
        };
        assert!(!line.synthetic);
        assert_eq!(line.content.get_i64("height"), Some(1000));

        let TreeEvent::Start(Node::Text(run)) = &events[2] else {
            panic!("expected an empty run, got {:?}", events[2]);
        };
        assert_eq!(run.span, Span::new(0, 0));
        assert_eq!(run.charshape_id, Some(7));
        assert!(run.text.is_empty());
    }

    #[test]
    fn test_malformed_char_shapes_fail() {
        // Two shapes declared, one stored
        let result: Result<Vec<_>> = shape_paragraphs(model_events(numbered(vec![
            (TagId::ParaHeader, 0, para_header(2, 0)),
            (TagId::ParaText, 1, units("ab")),
            (TagId::ParaCharShape, 1, char_shapes(&[(0, 1)])),
        ])))
        .collect();
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_paragraphs_are_shaped() {
        let mut text = extended(code::DRAWING_TABLE_OBJECT, chid::TBL);
        text.extend(units("\r"));
        let events = shaped(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, text),
            (TagId::CtrlHeader, 1, control_payload(chid::TBL, COMMON_CONTROL_LEN)),
            (TagId::Table, 2, table_body_payload(&[1])),
            (TagId::ListHeader, 2, vec![0; TABLE_CELL_LEN]),
            (TagId::ParaHeader, 2, para_header(0, 0)),
            (TagId::ParaText, 3, units("in")),
        ]);
        assert_eq!(
            render(&events),
            "<Paragraph><LineSeg><TableControl><TableBody/><TableCell/>\
             <Paragraph><LineSeg>'in'</LineSeg></Paragraph></TableControl>\
             <PARAGRAPH_BREAK/></LineSeg></Paragraph>"
        );
    }
}
