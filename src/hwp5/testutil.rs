//! Record builders and event rendering shared by the unit tests.

use super::header::Version;
use super::record::{Record, TagId};
use super::resolver::{resolve_models, ParseContext};
use super::tree::{level_to_events, TreeEvent};
use crate::error::Result;
use crate::model::{Chid, Node};
use bytes::Bytes;

pub(crate) const COMMON_CONTROL_LEN: usize = 36;
pub(crate) const TABLE_CAPTION_LEN: usize = 8 + 14;
pub(crate) const TABLE_CELL_LEN: usize = 8 + 30;

pub(crate) fn record(tag: TagId, level: u16, seqno: u32, payload: Vec<u8>) -> Record {
    Record {
        tag_id: tag as u16,
        level,
        seqno,
        offset: 0,
        payload: Bytes::from(payload),
    }
}

/// Numbers records in order.
pub(crate) fn numbered(records: Vec<(TagId, u16, Vec<u8>)>) -> Vec<Record> {
    records
        .into_iter()
        .enumerate()
        .map(|(seqno, (tag, level, payload))| record(tag, level, seqno as u32, payload))
        .collect()
}

pub(crate) fn units(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

pub(crate) fn extended(code: u16, id: Chid) -> Vec<u8> {
    let mut out = code.to_le_bytes().to_vec();
    out.extend_from_slice(&id.to_stored());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&code.to_le_bytes());
    out
}

pub(crate) fn inline(code: u16) -> Vec<u8> {
    let mut out = code.to_le_bytes().to_vec();
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(&code.to_le_bytes());
    out
}

/// PARA_HEADER payload for the default (newest) version.
pub(crate) fn para_header(charshapes: u16, linesegs: u16) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&charshapes.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&linesegs.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data
}

pub(crate) fn char_shapes(pairs: &[(u32, u32)]) -> Vec<u8> {
    pairs
        .iter()
        .flat_map(|(pos, id)| pos.to_le_bytes().into_iter().chain(id.to_le_bytes()))
        .collect()
}

pub(crate) fn line_segs(chpos: &[u32]) -> Vec<u8> {
    let mut data = Vec::new();
    for (i, pos) in chpos.iter().enumerate() {
        data.extend_from_slice(&pos.to_le_bytes());
        // y, height, height_text, height_baseline, space_below, x, width
        for field in [i as i32 * 1000, 1000, 1000, 850, 600, 0, 42520] {
            data.extend_from_slice(&field.to_le_bytes());
        }
        data.extend_from_slice(&0u32.to_le_bytes());
    }
    data
}

/// CTRL_HEADER payload: stored chid followed by zeroed fields.
pub(crate) fn control_payload(id: Chid, extra: usize) -> Vec<u8> {
    let mut data = id.to_stored().to_vec();
    data.resize(4 + extra, 0);
    data
}

/// CTRL_HEADER payload of a field control.
pub(crate) fn field_payload(id: Chid, command: &str) -> Vec<u8> {
    let mut data = id.to_stored().to_vec();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.push(0);
    data.extend_from_slice(&(command.encode_utf16().count() as u16).to_le_bytes());
    data.extend(units(command));
    data.extend_from_slice(&0u32.to_le_bytes());
    data
}

pub(crate) fn table_body_payload(rowcols: &[u16]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&(rowcols.len() as u16).to_le_bytes());
    let cols = rowcols.iter().copied().max().unwrap_or(0);
    data.extend_from_slice(&cols.to_le_bytes());
    data.extend_from_slice(&[0u8; 2 + 8]);
    for n in rowcols {
        data.extend_from_slice(&n.to_le_bytes());
    }
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data
}

/// Resolved models of `records` as raw tree events.
pub(crate) fn model_events(records: Vec<Record>) -> impl Iterator<Item = Result<TreeEvent<Node>>> {
    let models = resolve_models(
        records.into_iter().map(Ok),
        ParseContext::new(Version::default(), "BodyText/Section0"),
    );
    level_to_events(models.map(|m| m.map(|m| (m.level, Node::Model(m)))))
}

fn label(node: &Node) -> String {
    match node {
        Node::Model(m) => m.model_type.name().to_string(),
        Node::LineSeg(_) => "LineSeg".to_string(),
        Node::Text(run) => format!("'{}'", run.text),
        Node::ControlChar(run) => run.control.name().to_string(),
        Node::TableRow(_) => "Row".to_string(),
    }
}

/// Renders events as `<A><B/></A>`-style markup; text runs render inline.
pub(crate) fn render(events: &[TreeEvent<Node>]) -> String {
    let mut out = String::new();
    let mut iter = events.iter().peekable();
    while let Some(event) = iter.next() {
        match event {
            TreeEvent::Start(node) => {
                let closes_now = matches!(iter.peek(), Some(TreeEvent::End(end)) if end.same_as(node));
                if closes_now {
                    iter.next();
                    match node {
                        Node::Text(_) => out.push_str(&label(node)),
                        _ => out.push_str(&format!("<{}/>", label(node))),
                    }
                } else {
                    out.push_str(&format!("<{}>", label(node)));
                }
            }
            TreeEvent::End(node) => out.push_str(&format!("</{}>", label(node))),
        }
    }
    out
}
