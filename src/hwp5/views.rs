//! Typed views of the records the merging stages read.
//!
//! Decoded content is an ordered field list. The stages that rebuild
//! paragraphs and tables only need a handful of its fields, and read them
//! through these views so that a missing field is reported instead of being
//! taken as zero.

use super::models::ModelType;
use crate::error::{Error, Result};
use crate::model::{Content, Model, TextChunk, Value};

fn missing(model: &Model, field: &str) -> Error {
    Error::InvalidData(format!(
        "{} #{} has no `{}` field",
        model.model_type, model.seqno, field
    ))
}

fn expect_type(model: &Model, ty: ModelType) -> Result<()> {
    if model.is_a(ty) {
        Ok(())
    } else {
        Err(Error::InvalidData(format!(
            "expected {} but record #{} is {}",
            ty, model.seqno, model.model_type
        )))
    }
}

fn field_u32(model: &Model, content: &Content, field: &str) -> Result<u32> {
    content.get_u32(field).ok_or_else(|| missing(model, field))
}

/// Items of an array field whose elements are structs.
fn struct_items<'a>(model: &'a Model, field: &str) -> Result<Vec<&'a Content>> {
    let items = model
        .content
        .get_array(field)
        .ok_or_else(|| missing(model, field))?;
    items
        .iter()
        .map(|item| item.as_struct().ok_or_else(|| missing(model, field)))
        .collect()
}

/// Text chunks of a ParaText record.
pub fn text_chunks(model: &Model) -> Result<&[TextChunk]> {
    expect_type(model, ModelType::ParaText)?;
    model
        .content
        .get("chunks")
        .and_then(Value::as_text)
        .ok_or_else(|| missing(model, "chunks"))
}

/// Start of a character shape within its paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharShapePos {
    pub pos: u32,
    pub charshape_id: u32,
}

impl CharShapePos {
    /// Reads every entry of a ParaCharShape record.
    pub fn list(model: &Model) -> Result<Vec<Self>> {
        expect_type(model, ModelType::ParaCharShape)?;
        struct_items(model, "charshapes")?
            .into_iter()
            .map(|entry| {
                Ok(Self {
                    pos: field_u32(model, entry, "pos")?,
                    charshape_id: field_u32(model, entry, "charshape_id")?,
                })
            })
            .collect()
    }
}

/// One line of a ParaLineSeg record; `content` keeps the full layout.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSegView {
    pub chpos: u32,
    pub content: Content,
}

impl LineSegView {
    pub fn list(model: &Model) -> Result<Vec<Self>> {
        expect_type(model, ModelType::ParaLineSeg)?;
        struct_items(model, "linesegs")?
            .into_iter()
            .map(|line| {
                Ok(Self {
                    chpos: field_u32(model, line, "chpos")?,
                    content: line.clone(),
                })
            })
            .collect()
    }
}

/// Row layout of a TableBody record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBodyView {
    pub rows: u32,
    pub cols: u32,
    /// Cell count of every row.
    pub rowcols: Vec<u32>,
}

impl TableBodyView {
    pub fn from_model(model: &Model) -> Result<Self> {
        expect_type(model, ModelType::TableBody)?;
        let rowcols = model
            .content
            .get_array("rowcols")
            .ok_or_else(|| missing(model, "rowcols"))?
            .iter()
            .map(|cells| cells.as_u32().ok_or_else(|| missing(model, "rowcols")))
            .collect::<Result<_>>()?;
        Ok(Self {
            rows: field_u32(model, &model.content, "rows")?,
            cols: field_u32(model, &model.content, "cols")?,
            rowcols,
        })
    }
}

/// Paragraph list header, including its refinements such as table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHeaderView {
    /// Number of paragraphs stored after the header.
    pub paragraphs: u32,
    pub listflags: u32,
}

impl ListHeaderView {
    pub fn from_model(model: &Model) -> Result<Self> {
        expect_type(model, ModelType::ListHeader)?;
        Ok(Self {
            paragraphs: field_u32(model, &model.content, "paragraphs")?,
            listflags: field_u32(model, &model.content, "listflags")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwp5::control::chid;
    use crate::hwp5::record::TagId;
    use crate::hwp5::testutil::*;
    use crate::hwp5::tree::TreeEvent;
    use crate::model::Node;
    use std::rc::Rc;

    fn models(records: Vec<(TagId, u16, Vec<u8>)>) -> Vec<Rc<Model>> {
        model_events(numbered(records))
            .filter_map(|e| match e {
                Ok(TreeEvent::Start(Node::Model(m))) => Some(m),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_paragraph_views() {
        let models = models(vec![
            (TagId::ParaHeader, 0, para_header(2, 2)),
            (TagId::ParaText, 1, units("abc")),
            (TagId::ParaCharShape, 1, char_shapes(&[(0, 3), (2, 4)])),
            (TagId::ParaLineSeg, 1, line_segs(&[0, 2])),
        ]);

        assert_eq!(text_chunks(&models[1]).unwrap().len(), 1);
        assert_eq!(
            CharShapePos::list(&models[2]).unwrap(),
            vec![
                CharShapePos { pos: 0, charshape_id: 3 },
                CharShapePos { pos: 2, charshape_id: 4 },
            ]
        );
        let lines = LineSegView::list(&models[3]).unwrap();
        assert_eq!(lines.iter().map(|l| l.chpos).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(lines[1].content.get_i64("y"), Some(1000));
    }

    #[test]
    fn test_table_views() {
        let mut cell = vec![0; TABLE_CELL_LEN];
        cell[0] = 2;
        let models = models(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::CtrlHeader, 1, control_payload(chid::TBL, COMMON_CONTROL_LEN)),
            (TagId::Table, 2, table_body_payload(&[2, 1])),
            (TagId::ListHeader, 2, cell),
        ]);

        let body = TableBodyView::from_model(&models[2]).unwrap();
        assert_eq!(body.rows, 2);
        assert_eq!(body.cols, 2);
        assert_eq!(body.rowcols, vec![2, 1]);

        assert_eq!(models[3].model_type, ModelType::TableCell);
        assert_eq!(ListHeaderView::from_model(&models[3]).unwrap().paragraphs, 2);
    }

    #[test]
    fn test_missing_field_is_invalid_data() {
        let models = models(vec![(TagId::ParaHeader, 0, para_header(0, 0))]);
        let mut model = Model::clone(&models[0]);
        model.model_type = ModelType::TableBody;
        model.content = Content::new();

        match TableBodyView::from_model(&model) {
            Err(Error::InvalidData(message)) => assert!(message.contains("rowcols")),
            other => panic!("expected InvalidData, got {:?}", other),
        }
        assert!(matches!(
            ListHeaderView::from_model(&models[0]),
            Err(Error::InvalidData(_))
        ));
    }
}
