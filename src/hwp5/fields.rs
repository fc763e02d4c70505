//! Field span matching.
//!
//! A field control record sits where its FIELD_START placeholder was, but
//! the text it covers runs up to a later FIELD_END character. This stage
//! holds back the field's end event until that character and drops the
//! character itself, so the covered runs become children of the field.
//! Line ends close every open field and the next line of the same
//! paragraph reopens them.

use super::control::code;
use super::models::ModelType;
use super::tree::TreeEvent;
use crate::error::Result;
use crate::model::Node;
use log::warn;
use std::collections::VecDeque;

#[derive(Default)]
struct ParagraphFrame {
    in_line: bool,
    open: Vec<Node>,
    reopen: Vec<Node>,
}

/// Event stage that extends field controls over the text they cover.
pub struct MatchFields<I> {
    inner: I,
    frames: Vec<ParagraphFrame>,
    pending: VecDeque<TreeEvent<Node>>,
    skip_end: Option<Node>,
}

pub fn match_fields<I>(events: I) -> MatchFields<I::IntoIter>
where
    I: IntoIterator<Item = Result<TreeEvent<Node>>>,
{
    MatchFields {
        inner: events.into_iter(),
        frames: Vec::new(),
        pending: VecDeque::new(),
        skip_end: None,
    }
}

fn is_field_end(node: &Node) -> bool {
    matches!(node, Node::ControlChar(run) if run.control.code == code::FIELD_END)
}

impl<I> MatchFields<I> {
    fn handle(&mut self, event: TreeEvent<Node>) {
        match event {
            TreeEvent::Start(node) => self.start(node),
            TreeEvent::End(node) => self.end(node),
        }
    }

    fn start(&mut self, node: Node) {
        if node.is_model(ModelType::Paragraph) {
            self.frames.push(ParagraphFrame::default());
            self.pending.push_back(TreeEvent::Start(node));
            return;
        }

        let Some(frame) = self.frames.last_mut() else {
            self.pending.push_back(TreeEvent::Start(node));
            return;
        };

        match node {
            Node::LineSeg(_) => {
                frame.in_line = true;
                self.pending.push_back(TreeEvent::Start(node));
                for field in frame.reopen.drain(..) {
                    self.pending.push_back(TreeEvent::Start(field.clone()));
                    frame.open.push(field);
                }
            }
            _ if frame.in_line && is_field_end(&node) => match frame.open.pop() {
                Some(field) => {
                    self.pending.push_back(TreeEvent::End(field));
                    self.skip_end = Some(node);
                }
                None => {
                    warn!("FIELD_END without an open field");
                    self.pending.push_back(TreeEvent::Start(node));
                }
            },
            _ => self.pending.push_back(TreeEvent::Start(node)),
        }
    }

    fn end(&mut self, node: Node) {
        if self.skip_end.as_ref().is_some_and(|skip| skip.same_as(&node)) {
            self.skip_end = None;
            return;
        }

        if node.is_model(ModelType::Paragraph) {
            if let Some(frame) = self.frames.pop() {
                if !frame.reopen.is_empty() {
                    warn!("{} field(s) not terminated in paragraph", frame.reopen.len());
                }
                self.pending
                    .extend(frame.open.into_iter().rev().map(TreeEvent::End));
            }
            self.pending.push_back(TreeEvent::End(node));
            return;
        }

        let Some(frame) = self.frames.last_mut() else {
            self.pending.push_back(TreeEvent::End(node));
            return;
        };

        match node {
            Node::LineSeg(_) => {
                frame.in_line = false;
                self.pending
                    .extend(frame.open.iter().rev().cloned().map(TreeEvent::End));
                frame.reopen = std::mem::take(&mut frame.open);
                self.pending.push_back(TreeEvent::End(node));
            }
            _ if frame.in_line && node.is_model(ModelType::Field) => frame.open.push(node),
            _ => self.pending.push_back(TreeEvent::End(node)),
        }
    }
}

impl<I> Iterator for MatchFields<I>
where
    I: Iterator<Item = Result<TreeEvent<Node>>>,
{
    type Item = Result<TreeEvent<Node>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            match self.inner.next()? {
                Ok(event) => self.handle(event),
                Err(e) => {
                    self.pending.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwp5::control::chid;
    use crate::hwp5::paragraph::shape_paragraphs;
    use crate::hwp5::record::TagId;
    use crate::hwp5::testutil::*;

    fn matched(records: Vec<(TagId, u16, Vec<u8>)>) -> String {
        let events: Vec<_> = match_fields(shape_paragraphs(model_events(numbered(records))))
            .collect::<Result<_>>()
            .unwrap();
        render(&events)
    }

    fn hyperlink_text(inner: &str) -> Vec<u8> {
        let mut text = units("a");
        text.extend(extended(code::FIELD_START, chid::FIELD_HYPERLINK));
        text.extend(units(inner));
        text.extend(inline(code::FIELD_END));
        text.extend(units("b\r"));
        text
    }

    #[test]
    fn test_field_covers_text_up_to_field_end() {
        let rendered = matched(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, hyperlink_text("link")),
            (
                TagId::CtrlHeader,
                1,
                field_payload(chid::FIELD_HYPERLINK, "http://example.com"),
            ),
        ]);
        assert_eq!(
            rendered,
            "<Paragraph><LineSeg>'a'<FieldHyperLink>'link'</FieldHyperLink>\
             'b'<PARAGRAPH_BREAK/></LineSeg></Paragraph>"
        );
    }

    #[test]
    fn test_field_reopens_on_next_line() {
        let rendered = matched(vec![
            (TagId::ParaHeader, 0, para_header(0, 2)),
            (TagId::ParaText, 1, hyperlink_text("link")),
            (TagId::ParaLineSeg, 1, line_segs(&[0, 11])),
            (
                TagId::CtrlHeader,
                1,
                field_payload(chid::FIELD_HYPERLINK, "http://example.com"),
            ),
        ]);
        assert_eq!(
            rendered,
            "<Paragraph><LineSeg>'a'<FieldHyperLink>'li'</FieldHyperLink></LineSeg>\
             <LineSeg><FieldHyperLink>'nk'</FieldHyperLink>'b'<PARAGRAPH_BREAK/></LineSeg>\
             </Paragraph>"
        );
    }

    #[test]
    fn test_unmatched_field_end_is_kept() {
        let mut text = units("x");
        text.extend(inline(code::FIELD_END));
        let rendered = matched(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, text),
        ]);
        assert_eq!(
            rendered,
            "<Paragraph><LineSeg>'x'<FIELD_END/></LineSeg></Paragraph>"
        );
    }

    #[test]
    fn test_unterminated_field_closes_with_line() {
        let mut text = units("a");
        text.extend(extended(code::FIELD_START, chid::FIELD_DATE));
        text.extend(units("b"));
        let rendered = matched(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, text),
            (TagId::CtrlHeader, 1, field_payload(chid::FIELD_DATE, "")),
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, units("c")),
        ]);
        assert_eq!(
            rendered,
            "<Paragraph><LineSeg>'a'<FieldDate>'b'</FieldDate></LineSeg></Paragraph>\
             <Paragraph><LineSeg>'c'</LineSeg></Paragraph>"
        );
    }
}
