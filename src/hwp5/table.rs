//! Table row reconstruction.
//!
//! Cells are stored as a flat list under their table control. The table
//! body record carries the cell count of every row; this stage uses it to
//! wrap each run of cells in a synthetic `TableRow`.

use super::models::ModelType;
use super::tree::TreeEvent;
use super::views::TableBodyView;
use crate::error::Result;
use crate::model::{Node, TableRow};
use log::warn;
use std::collections::VecDeque;

/// Position of a cell within its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowMarker {
    Open,
    Continue,
    Close,
    Single,
}

impl RowMarker {
    fn opens(self) -> bool {
        matches!(self, RowMarker::Open | RowMarker::Single)
    }

    fn closes(self) -> bool {
        matches!(self, RowMarker::Close | RowMarker::Single)
    }
}

fn row_markers(rowcols: impl IntoIterator<Item = u32>) -> VecDeque<RowMarker> {
    let mut markers = VecDeque::new();
    for cells in rowcols {
        match cells {
            0 => {}
            1 => markers.push_back(RowMarker::Single),
            n => {
                markers.push_back(RowMarker::Open);
                markers.extend((2..n).map(|_| RowMarker::Continue));
                markers.push_back(RowMarker::Close);
            }
        }
    }
    markers
}

struct TableFrame {
    table: Node,
    markers: VecDeque<RowMarker>,
    /// Open descendants of the table control.
    depth: usize,
    /// Marker of the cell currently open.
    cell: Option<RowMarker>,
    row: Option<TableRow>,
    rows: usize,
}

impl TableFrame {
    fn new(table: Node) -> Self {
        Self {
            table,
            markers: VecDeque::new(),
            depth: 0,
            cell: None,
            row: None,
            rows: 0,
        }
    }
}

/// Event stage that groups table cells into rows.
pub struct RestructureTables<I> {
    inner: I,
    frames: Vec<TableFrame>,
    pending: VecDeque<TreeEvent<Node>>,
    done: bool,
}

pub fn restructure_tables<I>(events: I) -> RestructureTables<I::IntoIter>
where
    I: IntoIterator<Item = Result<TreeEvent<Node>>>,
{
    RestructureTables {
        inner: events.into_iter(),
        frames: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    }
}

impl<I> RestructureTables<I> {
    fn start(&mut self, node: Node) -> Result<()> {
        if let Some(frame) = self.frames.last_mut() {
            if frame.depth == 0 {
                if let Some(body) = node.as_model().filter(|m| m.is_a(ModelType::TableBody)) {
                    frame.markers = row_markers(TableBodyView::from_model(body)?.rowcols);
                } else if node.is_model(ModelType::TableCell) {
                    let marker = frame.markers.pop_front();
                    match marker {
                        Some(marker) if marker.opens() => {
                            if let Some(row) = frame.row.take() {
                                warn!("row {} left open by a new row", row.index);
                                self.pending.push_back(TreeEvent::End(Node::TableRow(row)));
                            }
                            let row = TableRow { index: frame.rows };
                            frame.rows += 1;
                            frame.row = Some(row);
                            self.pending.push_back(TreeEvent::Start(Node::TableRow(row)));
                        }
                        Some(_) => {}
                        None => warn!("table has more cells than its rows declare"),
                    }
                    frame.cell = marker;
                }
            }
            frame.depth += 1;
        }

        if node.is_model(ModelType::TableControl) {
            self.frames.push(TableFrame::new(node.clone()));
        }
        self.pending.push_back(TreeEvent::Start(node));
        Ok(())
    }

    fn end(&mut self, node: Node) {
        let closes_table = self
            .frames
            .last()
            .is_some_and(|frame| frame.depth == 0 && frame.table.same_as(&node));
        if closes_table {
            if let Some(frame) = self.frames.pop() {
                if let Some(row) = frame.row {
                    warn!("row {} not closed before the end of its table", row.index);
                    self.pending.push_back(TreeEvent::End(Node::TableRow(row)));
                }
            }
        }

        let Some(frame) = self.frames.last_mut() else {
            self.pending.push_back(TreeEvent::End(node));
            return;
        };
        frame.depth = frame.depth.saturating_sub(1);
        self.pending.push_back(TreeEvent::End(node));

        if frame.depth == 0 {
            if let Some(marker) = frame.cell.take() {
                if marker.closes() {
                    if let Some(row) = frame.row.take() {
                        self.pending.push_back(TreeEvent::End(Node::TableRow(row)));
                    }
                }
            }
        }
    }
}

impl<I> Iterator for RestructureTables<I>
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
            let started = match self.inner.next()? {
                Ok(TreeEvent::Start(node)) => self.start(node),
                Ok(TreeEvent::End(node)) => {
                    self.end(node);
                    Ok(())
                }
                Err(e) => Err(e),
            };
            if let Err(e) = started {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}
