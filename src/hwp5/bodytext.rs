//! BodyText section event pipeline.

use super::fields::match_fields;
use super::models::ModelType;
use super::paragraph::shape_paragraphs;
use super::table::restructure_tables;
use super::tree::{level_to_events, TreeEvent};
use super::views::ListHeaderView;
use super::EventStream;
use crate::error::Result;
use crate::model::{Model, Node};
use crate::parse_options::TreeMode;
use std::collections::VecDeque;
use std::rc::Rc;

/// Builds the event stream of one section from its resolved models.
pub fn section_events<I>(models: I, mode: TreeMode) -> EventStream
where
    I: IntoIterator<Item = Result<Rc<Model>>>,
    I::IntoIter: 'static,
{
    let events = level_to_events(
        models
            .into_iter()
            .map(|m| m.map(|m| (m.level, Node::Model(m)))),
    );
    match mode {
        TreeMode::Raw => Box::new(events),
        TreeMode::Merged => Box::new(restructure_tables(match_fields(shape_paragraphs(
            adopt_list_paragraphs(events),
        )))),
    }
}

struct OpenList {
    node: Node,
    remaining: u32,
    /// Input depth at which the list's siblings open.
    depth: usize,
}

/// Event stage that moves the paragraphs following a list header under it.
///
/// A list header announces how many paragraphs it owns; they are stored
/// as its next siblings. Adoption stops early at a sibling that is not a
/// paragraph or at the end of the common parent.
pub struct AdoptListParagraphs<I> {
    inner: I,
    depth: usize,
    lists: Vec<OpenList>,
    pending: VecDeque<TreeEvent<Node>>,
    done: bool,
}

pub fn adopt_list_paragraphs<I>(events: I) -> AdoptListParagraphs<I::IntoIter>
where
    I: IntoIterator<Item = Result<TreeEvent<Node>>>,
{
    AdoptListParagraphs {
        inner: events.into_iter(),
        depth: 0,
        lists: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    }
}

impl<I> AdoptListParagraphs<I> {
    /// Closes every adopting list whose siblings live at the current depth.
    fn close_lists_at_depth(&mut self) {
        let depth = self.depth;
        while let Some(list) = self.lists.pop_if(|list| list.depth == depth) {
            self.pending.push_back(TreeEvent::End(list.node));
        }
    }

    fn start(&mut self, node: Node) {
        let adopts = node.is_model(ModelType::Paragraph)
            && self
                .lists
                .last()
                .is_some_and(|list| list.depth == self.depth && list.remaining > 0);
        if adopts {
            if let Some(list) = self.lists.last_mut() {
                list.remaining -= 1;
            }
        } else {
            self.close_lists_at_depth();
        }
        self.depth += 1;
        self.pending.push_back(TreeEvent::Start(node));
    }

    fn end(&mut self, node: Node) -> Result<()> {
        // the parent closing ends adoption
        self.close_lists_at_depth();
        self.depth = self.depth.saturating_sub(1);

        if let Some(list) = node.as_model().filter(|m| m.is_a(ModelType::ListHeader)) {
            let remaining = ListHeaderView::from_model(list)?.paragraphs;
            if remaining > 0 {
                self.lists.push(OpenList {
                    node,
                    remaining,
                    depth: self.depth,
                });
                return Ok(());
            }
        }
        self.pending.push_back(TreeEvent::End(node));

        let exhausted = self
            .lists
            .last()
            .is_some_and(|list| list.depth == self.depth && list.remaining == 0);
        if exhausted {
            if let Some(list) = self.lists.pop() {
                self.pending.push_back(TreeEvent::End(list.node));
            }
        }
        Ok(())
    }
}

impl<I> Iterator for AdoptListParagraphs<I>
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
                Some(Ok(TreeEvent::Start(node))) => self.start(node),
                Some(Ok(TreeEvent::End(node))) => {
                    if let Err(e) = self.end(node) {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    let pending = &mut self.pending;
                    pending.extend(self.lists.drain(..).rev().map(|list| TreeEvent::End(list.node)));
                }
            }
        }
    }
}
