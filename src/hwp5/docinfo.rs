//! DocInfo stream post-processing.
//!
//! Some writers store the same face name several times within one
//! language group. Collapsing the repeats keeps font tables small and is
//! transparent to consumers as long as every CharShape reference is
//! remapped along with them.

use super::models::{ModelType, FACE_NAME_GROUPS};
use super::tree::{level_to_events, TreeEvent, TreeNode};
use super::EventStream;
use crate::error::Result;
use crate::model::{Content, Model, Node, Value};
use log::{debug, warn};
use std::collections::VecDeque;
use std::rc::Rc;

/// Builds the event stream of the DocInfo stream from its resolved models.
pub fn docinfo_events<I>(models: I, dedup: bool) -> EventStream
where
    I: IntoIterator<Item = Result<Rc<Model>>>,
    I::IntoIter: 'static,
{
    let events = level_to_events(
        models
            .into_iter()
            .map(|m| m.map(|m| (m.level, Node::Model(m)))),
    );
    if dedup {
        Box::new(dedup_face_names(events))
    } else {
        Box::new(events)
    }
}

/// Event stage that drops repeated face names and remaps their users.
pub struct DedupFaceNames<I> {
    inner: I,
    pending: VecDeque<TreeEvent<Node>>,
    done: bool,
}

pub fn dedup_face_names<I>(events: I) -> DedupFaceNames<I::IntoIter>
where
    I: IntoIterator<Item = Result<TreeEvent<Node>>>,
{
    DedupFaceNames {
        inner: events.into_iter(),
        pending: VecDeque::new(),
        done: false,
    }
}

impl<I> Iterator for DedupFaceNames<I>
where
    I: Iterator<Item = Result<TreeEvent<Node>>>,
{
    type Item = Result<TreeEvent<Node>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.pop_front() {
            return Some(Ok(event));
        }
        if self.done {
            return None;
        }
        match self.inner.next()? {
            Ok(TreeEvent::Start(node)) if node.is_model(ModelType::IdMappings) => {
                match TreeNode::collect(node, &mut self.inner) {
                    Ok(tree) => {
                        dedup_id_mappings(tree).flatten_into(&mut self.pending);
                        self.pending.pop_front().map(Ok)
                    }
                    Err(e) => {
                        self.done = true;
                        Some(Err(e))
                    }
                }
            }
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Index remapping of one language group.
#[derive(Debug, Default)]
struct GroupMap {
    kept: Vec<Content>,
    new_index: Vec<u32>,
}

impl GroupMap {
    /// Registers the next face name of the group; true if it is a repeat.
    fn add(&mut self, content: &Content) -> bool {
        match self.kept.iter().position(|c| c == content) {
            Some(existing) => {
                self.new_index.push(existing as u32);
                true
            }
            None => {
                self.new_index.push(self.kept.len() as u32);
                self.kept.push(content.clone());
                false
            }
        }
    }

    fn remap(&self, id: u32) -> u32 {
        self.new_index.get(id as usize).copied().unwrap_or(id)
    }
}

fn dedup_id_mappings(tree: TreeNode<Node>) -> TreeNode<Node> {
    let TreeNode { item, children } = tree;
    let Some(id_mappings) = item.as_model().cloned() else {
        return TreeNode { item, children };
    };

    let counts: Vec<u32> = FACE_NAME_GROUPS
        .iter()
        .map(|group| id_mappings.content.get_u32(group).unwrap_or(0))
        .collect();
    let mut groups: Vec<GroupMap> = counts.iter().map(|_| GroupMap::default()).collect();

    let mut group = 0;
    let mut seen_in_group = 0;
    let mut dropped = 0;
    let mut kept_children = Vec::with_capacity(children.len());
    for child in children {
        let Some(face) = child.item.as_model().filter(|m| m.is_a(ModelType::FaceName)) else {
            kept_children.push(child);
            continue;
        };
        while group < counts.len() && seen_in_group >= counts[group] {
            group += 1;
            seen_in_group = 0;
        }
        if group == counts.len() {
            warn!("FaceName #{} exceeds the declared font counts", face.seqno);
            kept_children.push(child);
            continue;
        }
        seen_in_group += 1;
        if groups[group].add(&face.content) {
            dropped += 1;
        } else {
            kept_children.push(child);
        }
    }

    if dropped == 0 {
        return TreeNode {
            item,
            children: kept_children,
        };
    }
    debug!("dropped {} repeated face names", dropped);

    let mut content = id_mappings.content.clone();
    for (name, map) in FACE_NAME_GROUPS.iter().zip(&groups) {
        if let Some(value) = content.get_mut(name) {
            *value = Value::U32(map.kept.len() as u32);
        }
    }
    let item = Node::Model(Rc::new(Model {
        content,
        ..Model::clone(&id_mappings)
    }));

    let children = kept_children
        .into_iter()
        .map(|child| remap_char_shape(child, &groups))
        .collect();
    TreeNode { item, children }
}

fn remap_char_shape(node: TreeNode<Node>, groups: &[GroupMap]) -> TreeNode<Node> {
    let Some(shape) = node.item.as_model().filter(|m| m.is_a(ModelType::CharShape)) else {
        return node;
    };
    let Some(faces) = shape.content.get_struct("font_face") else {
        return node;
    };

    let remapped: Content = faces
        .iter()
        .zip(groups)
        .map(|((lang, value), map)| {
            let value = match value.as_u32() {
                Some(id) => Value::U16(map.remap(id) as u16),
                None => value.clone(),
            };
            (lang, value)
        })
        .collect();

    let mut content = shape.content.clone();
    if let Some(value) = content.get_mut("font_face") {
        *value = Value::Struct(remapped);
    }
    TreeNode {
        item: Node::Model(Rc::new(Model {
            content,
            ..Model::clone(shape)
        })),
        children: node.children,
    }
}
