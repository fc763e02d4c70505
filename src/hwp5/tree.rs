//! Tree reconstruction from depth-tagged item sequences.
//!
//! Records carry a nesting level instead of explicit parent links. The views
//! here rebuild the nesting lazily: the event view turns `(level, item)`
//! pairs into balanced start/end events, the ancestor view pairs each item
//! with the chain of items that contain it.

use crate::error::{Error, Result};
use std::collections::VecDeque;

/// A start or end marker for one tree item.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent<T> {
    Start(T),
    End(T),
}

impl<T> TreeEvent<T> {
    /// Returns the item the event refers to.
    pub fn item(&self) -> &T {
        match self {
            TreeEvent::Start(item) | TreeEvent::End(item) => item,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, TreeEvent::Start(_))
    }

    pub fn is_end(&self) -> bool {
        matches!(self, TreeEvent::End(_))
    }

    /// Applies `f` to the item, keeping the event kind.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TreeEvent<U> {
        match self {
            TreeEvent::Start(item) => TreeEvent::Start(f(item)),
            TreeEvent::End(item) => TreeEvent::End(f(item)),
        }
    }
}

/// Stack of open items, indexed by depth relative to the first level seen.
#[derive(Debug)]
pub struct AncestorStack<T> {
    baseline: Option<u16>,
    stack: Vec<T>,
}

impl<T> Default for AncestorStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AncestorStack<T> {
    pub fn new() -> Self {
        Self {
            baseline: None,
            stack: Vec::new(),
        }
    }

    /// Prepares the stack for an item at `level`.
    ///
    /// Pops every open item that cannot contain the new one, innermost
    /// first, handing each to `on_pop`. Afterwards the stack holds exactly
    /// the new item's ancestors. Fails without popping anything when the
    /// level would skip a depth or falls below the baseline.
    pub fn descend(&mut self, level: u16, mut on_pop: impl FnMut(T)) -> Result<()> {
        let baseline = *self.baseline.get_or_insert(level);
        let structure_error = || Error::Structure {
            level,
            baseline,
            depth: self.stack.len(),
        };

        let depth = level.checked_sub(baseline).ok_or_else(structure_error)? as usize;
        if depth > self.stack.len() {
            return Err(structure_error());
        }

        while self.stack.len() > depth {
            if let Some(popped) = self.stack.pop() {
                on_pop(popped);
            }
        }
        Ok(())
    }

    /// Opens an item below the current ancestors.
    pub fn push(&mut self, item: T) {
        self.stack.push(item);
    }

    /// Open items, outermost first.
    pub fn ancestors(&self) -> &[T] {
        &self.stack
    }

    pub fn ancestors_mut(&mut self) -> &mut [T] {
        &mut self.stack
    }

    /// Number of open items.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Pops every open item, innermost first.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || self.stack.pop())
    }
}

/// Lazy event view over `(level, item)` pairs.
pub struct EventIter<I, T> {
    inner: I,
    stack: AncestorStack<T>,
    pending: VecDeque<TreeEvent<T>>,
    done: bool,
}

/// Turns a flat `(level, item)` sequence into balanced start/end events.
pub fn level_to_events<I, T>(items: I) -> EventIter<I::IntoIter, T>
where
    I: IntoIterator<Item = Result<(u16, T)>>,
    T: Clone,
{
    EventIter {
        inner: items.into_iter(),
        stack: AncestorStack::new(),
        pending: VecDeque::new(),
        done: false,
    }
}

impl<I, T> Iterator for EventIter<I, T>
where
    I: Iterator<Item = Result<(u16, T)>>,
    T: Clone,
{
    type Item = Result<TreeEvent<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            if self.done {
                return None;
            }

            match self.inner.next() {
                Some(Ok((level, item))) => {
                    let pending = &mut self.pending;
                    if let Err(e) = self
                        .stack
                        .descend(level, |popped| pending.push_back(TreeEvent::End(popped)))
                    {
                        self.done = true;
                        return Some(Err(e));
                    }
                    self.pending.push_back(TreeEvent::Start(item.clone()));
                    self.stack.push(item);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    let pending = &mut self.pending;
                    pending.extend(self.stack.drain().map(TreeEvent::End));
                }
            }
        }
    }
}

/// Lazy ancestor view over `(level, item)` pairs.
pub struct Ancestors<I, T> {
    inner: I,
    stack: AncestorStack<T>,
    done: bool,
}

/// Pairs each item with a snapshot of its ancestors, outermost first.
pub fn prefix_ancestors<I, T>(items: I) -> Ancestors<I::IntoIter, T>
where
    I: IntoIterator<Item = Result<(u16, T)>>,
    T: Clone,
{
    Ancestors {
        inner: items.into_iter(),
        stack: AncestorStack::new(),
        done: false,
    }
}

impl<I, T> Iterator for Ancestors<I, T>
where
    I: Iterator<Item = Result<(u16, T)>>,
    T: Clone,
{
    type Item = Result<(Vec<T>, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = match self.inner.next()? {
            Ok((level, item)) => self.stack.descend(level, drop).map(|()| {
                let ancestors = self.stack.ancestors().to_vec();
                self.stack.push(item.clone());
                (ancestors, item)
            }),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

/// An owned subtree, for stages that need a whole branch at once.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<T> {
    pub item: T,
    pub children: Vec<TreeNode<T>>,
}

impl<T: Clone> TreeNode<T> {
    pub fn new(item: T) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    /// Collects the subtree whose `Start(root)` was just consumed, reading
    /// `events` up to and including the matching end event.
    pub fn collect<I>(root: T, events: &mut I) -> Result<Self>
    where
        I: Iterator<Item = Result<TreeEvent<T>>>,
    {
        let mut stack = vec![TreeNode::new(root)];
        for event in events {
            match event? {
                TreeEvent::Start(item) => stack.push(TreeNode::new(item)),
                TreeEvent::End(_) => {
                    let Some(node) = stack.pop() else { break };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => return Ok(node),
                    }
                }
            }
        }
        Err(Error::InvalidData("event stream ended inside a subtree".into()))
    }

    /// Emits the subtree as balanced events.
    pub fn flatten_into(self, out: &mut VecDeque<TreeEvent<T>>) {
        out.push_back(TreeEvent::Start(self.item.clone()));
        for child in self.children {
            child.flatten_into(out);
        }
        out.push_back(TreeEvent::End(self.item));
    }
}
