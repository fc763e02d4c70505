//! Record-to-model resolution.
//!
//! A record is decoded with its tag's base schema first. The base type may
//! then be refined: by the control id it carries, or by the parent it
//! appears under. The refinement's own fields follow the base fields in the
//! payload. Finally the parent is told about its new child, which is how a
//! table learns that later list headers are cells rather than its caption.

use super::header::Version;
use super::models::ModelType;
use super::record::Record;
use super::registry::{registry, ExtensionKey, ExtensionRule, TypeRegistry};
use super::schema::{DecodeScope, Decoder, FieldError};
use super::tree::AncestorStack;
use crate::error::{Error, ParseError, Result};
use crate::model::{Content, Model};
use log::{debug, trace, warn};
use std::rc::Rc;

/// Per-record decoding state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseContext {
    pub version: Version,
    /// Name of the stream being decoded, for diagnostics.
    pub stream: Rc<str>,
    /// Set on a table control once its TableBody child has been resolved.
    pub seen_table_body: bool,
}

impl ParseContext {
    pub fn new(version: Version, stream: impl Into<Rc<str>>) -> Self {
        Self {
            version,
            stream: stream.into(),
            seen_table_body: false,
        }
    }

    /// A fresh context for one record, inheriting stream-wide settings.
    pub fn fork(&self) -> Self {
        Self {
            version: self.version,
            stream: Rc::clone(&self.stream),
            seen_table_body: false,
        }
    }
}

/// A resolved model together with its mutable context.
#[derive(Debug, Clone)]
pub struct Frame {
    pub model: Rc<Model>,
    pub context: ParseContext,
}

/// Turns records into models, given the frames of their ancestors.
#[derive(Debug, Clone)]
pub struct ModelResolver<'r> {
    registry: &'r TypeRegistry,
    root: ParseContext,
}

impl ModelResolver<'static> {
    /// Creates a resolver backed by the global registry.
    pub fn new(root: ParseContext) -> Self {
        Self::with_registry(registry(), root)
    }
}

impl<'r> ModelResolver<'r> {
    pub fn with_registry(registry: &'r TypeRegistry, root: ParseContext) -> Self {
        Self { registry, root }
    }

    pub fn root(&self) -> &ParseContext {
        &self.root
    }

    /// Resolves one record. `ancestors` are the frames of the records that
    /// contain it, outermost first; the innermost one is notified of the
    /// new child.
    pub fn resolve(&self, ancestors: &mut [Frame], record: Record) -> Result<Frame> {
        let context = self.root.fork();

        let Some(base) = self.registry.base_for_tag(record.tag_id) else {
            debug!(
                "{}: unknown tag {} at record #{}, keeping {} bytes",
                context.stream,
                record.tag_id,
                record.seqno,
                record.payload.len()
            );
            let model = Model {
                tag_id: record.tag_id,
                level: record.level,
                seqno: record.seqno,
                model_type: ModelType::Unknown,
                content: Content::new(),
                unparsed: (!record.payload.is_empty()).then(|| record.payload.clone()),
            };
            return Ok(Frame {
                model: Rc::new(model),
                context,
            });
        };

        let (model_type, content, unparsed) = {
            let frames: &[Frame] = ancestors;
            let parent = frames.last();
            let scope = DecodeScope {
                version: context.version,
                parent: parent.map(|p| (p.model.model_type, &p.model.content)),
            };
            let mut decoder = Decoder::new(&record.payload, scope);
            let mut content = Content::new();

            decoder
                .decode_fields(base.fields(), &mut content)
                .map_err(|e| parse_error(base, &record, frames, e))?;

            let refined = self.refine(base, &content, parent)?;
            if let Some(ty) = refined {
                for step in ty.refinement_chain() {
                    decoder
                        .decode_fields(step.fields(), &mut content)
                        .map_err(|e| parse_error(ty, &record, frames, e))?;
                }
            }

            let model_type = refined.unwrap_or(base);
            let unparsed = decoder.unparsed();
            if let Some(rest) = &unparsed {
                trace!(
                    "{}: {} #{} left {} bytes unparsed",
                    context.stream,
                    model_type,
                    record.seqno,
                    rest.len()
                );
            }
            (model_type, content, unparsed)
        };

        let model = Rc::new(Model {
            tag_id: record.tag_id,
            level: record.level,
            seqno: record.seqno,
            model_type,
            content,
            unparsed,
        });

        if let Some(parent) = ancestors.last_mut() {
            on_child(parent, &model);
        }

        Ok(Frame { model, context })
    }

    fn refine(
        &self,
        base: ModelType,
        content: &Content,
        parent: Option<&Frame>,
    ) -> Result<Option<ModelType>> {
        match base.extension_rule() {
            Some(ExtensionRule::ByChid(field)) => {
                let Some(id) = content.get_chid(field) else {
                    return Ok(None);
                };
                let found = self.registry.lookup(base, ExtensionKey::Chid(id))?;
                // Unlisted field kinds still behave as fields
                Ok(found.or_else(|| id.is_field().then_some(ModelType::Field)))
            }
            Some(ExtensionRule::ByParent) => match parent {
                Some(frame) => self.registry.lookup_by_parent(
                    base,
                    frame.model.model_type,
                    frame.context.seen_table_body,
                ),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }
}

/// Lets a parent react to a newly resolved child.
fn on_child(parent: &mut Frame, child: &Model) {
    if parent.model.is_a(ModelType::TableControl) && child.model_type == ModelType::TableBody {
        if parent.context.seen_table_body {
            warn!(
                "{}: table #{} has a second TableBody at record #{}",
                parent.context.stream, parent.model.seqno, child.seqno
            );
        }
        parent.context.seen_table_body = true;
    }
}

fn parse_error(ty: ModelType, record: &Record, ancestors: &[Frame], err: FieldError) -> Error {
    let path = ancestors
        .iter()
        .map(|frame| format!("{}#{}", frame.model.model_type, frame.model.seqno))
        .collect::<Vec<_>>()
        .join("/");
    ParseError {
        type_name: ty.name(),
        field: err.field,
        offset: err.offset,
        seqno: record.seqno,
        path,
        kind: err.kind,
    }
    .into()
}

/// Lazy stream of models resolved from a record stream.
pub struct ModelIter<I> {
    records: I,
    resolver: ModelResolver<'static>,
    stack: AncestorStack<Frame>,
    done: bool,
}

/// Resolves a record stream into models. Stops after the first error.
pub fn resolve_models<I>(records: I, root: ParseContext) -> ModelIter<I::IntoIter>
where
    I: IntoIterator<Item = Result<Record>>,
{
    ModelIter {
        records: records.into_iter(),
        resolver: ModelResolver::new(root),
        stack: AncestorStack::new(),
        done: false,
    }
}

impl<I> ModelIter<I>
where
    I: Iterator<Item = Result<Record>>,
{
    fn step(&mut self, record: Record) -> Result<Rc<Model>> {
        self.stack.descend(record.level, drop)?;
        let frame = self.resolver.resolve(self.stack.ancestors_mut(), record)?;
        let model = Rc::clone(&frame.model);
        self.stack.push(frame);
        Ok(model)
    }
}

impl<I> Iterator for ModelIter<I>
where
    I: Iterator<Item = Result<Record>>,
{
    type Item = Result<Rc<Model>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.records.next()?.and_then(|record| self.step(record));
        if result.is_err() {
            self.done = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldDecodeError;
    use crate::hwp5::control::chid;
    use crate::hwp5::record::TagId;
    use crate::hwp5::testutil::*;
    use crate::model::Chid;
    use bytes::Bytes;

    fn resolve_all(records: Vec<Record>, version: Version) -> Result<Vec<Rc<Model>>> {
        resolve_models(
            records.into_iter().map(Ok),
            ParseContext::new(version, "BodyText/Section0"),
        )
        .collect()
    }

    #[test]
    fn test_list_header_fixture() {
        let payload = vec![0x01, 0, 0, 0, 0x20, 0, 0, 0, 0, 0, 0, 0];
        let models =
            resolve_all(vec![record(TagId::ListHeader, 0, 0, payload)], Version::default())
                .unwrap();

        let model = &models[0];
        assert_eq!(model.model_type, ModelType::ListHeader);
        assert_eq!(model.content.get_u32("paragraphs"), Some(1));
        assert_eq!(model.content.get_u32("unknown1"), Some(0));
        assert_eq!(model.content.get_u32("listflags"), Some(0x20));
        assert_eq!(model.unparsed.as_ref().map(|b| b.len()), Some(4));
    }

    #[test]
    fn test_table_caption_then_cells() {
        let records = vec![
            record(
                TagId::CtrlHeader,
                0,
                0,
                control_payload(chid::TBL, COMMON_CONTROL_LEN),
            ),
            record(TagId::ListHeader, 1, 1, vec![0; TABLE_CAPTION_LEN]),
            record(TagId::Table, 1, 2, table_body_payload(&[2])),
            record(TagId::ListHeader, 1, 3, vec![0; TABLE_CELL_LEN]),
            record(TagId::ListHeader, 1, 4, vec![0; TABLE_CELL_LEN]),
        ];
        let models = resolve_all(records, Version::default()).unwrap();
        let types: Vec<_> = models.iter().map(|m| m.model_type).collect();

        assert_eq!(
            types,
            vec![
                ModelType::TableControl,
                ModelType::TableCaption,
                ModelType::TableBody,
                ModelType::TableCell,
                ModelType::TableCell,
            ]
        );
        // Base, common-control and own fields in order
        let names: Vec<_> = models[3].content.iter().map(|(n, _)| n).take(4).collect();
        assert_eq!(names, vec!["paragraphs", "unknown1", "listflags", "col"]);
        assert!(models[0].content.contains("instance_id"));
        assert!(models[3].unparsed.is_none());
    }

    #[test]
    fn test_flag_resets_for_each_table() {
        let records = vec![
            record(TagId::CtrlHeader, 0, 0, control_payload(chid::TBL, COMMON_CONTROL_LEN)),
            record(TagId::Table, 1, 1, table_body_payload(&[1])),
            record(TagId::CtrlHeader, 0, 2, control_payload(chid::TBL, COMMON_CONTROL_LEN)),
            record(TagId::ListHeader, 1, 3, vec![0; TABLE_CAPTION_LEN]),
        ];
        let models = resolve_all(records, Version::default()).unwrap();
        assert_eq!(models[3].model_type, ModelType::TableCaption);
    }

    #[test]
    fn test_header_and_shape_contexts() {
        let records = vec![
            record(TagId::CtrlHeader, 0, 0, control_payload(chid::HEADER, 4)),
            record(TagId::ListHeader, 1, 1, vec![0; 8 + 10]),
            record(TagId::CtrlHeader, 0, 2, control_payload(chid::GSO, COMMON_CONTROL_LEN)),
            record(TagId::ShapeComponent, 1, 3, {
                let mut data = chid::GSO.to_stored().to_vec();
                data.extend_from_slice(&Chid::new(*b"$rec").to_stored());
                data.resize(4 + 4 + 44, 0);
                data
            }),
            record(TagId::ListHeader, 2, 4, vec![0; 8 + 12]),
        ];
        let models = resolve_all(records, Version::default()).unwrap();

        assert_eq!(models[0].model_type, ModelType::Header);
        assert_eq!(models[1].model_type, ModelType::HeaderParagraphList);
        assert_eq!(models[2].model_type, ModelType::GShapeObjectControl);
        assert_eq!(models[3].content.get_chid("chid0"), Some(chid::GSO));
        assert_eq!(
            models[3].content.get_chid("chid"),
            Some(Chid::new(*b"$rec"))
        );
        assert_eq!(models[4].model_type, ModelType::TextboxParagraphList);
    }

    #[test]
    fn test_field_controls() {
        let mut payload = chid::FIELD_HYPERLINK.to_stored().to_vec();
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.push(0);
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend("a:b".encode_utf16().flat_map(u16::to_le_bytes));
        payload.extend_from_slice(&7u32.to_le_bytes());

        let mut unlisted = payload.clone();
        unlisted[..4].copy_from_slice(&Chid::new(*b"%xyz").to_stored());

        let models = resolve_all(
            vec![
                record(TagId::CtrlHeader, 0, 0, payload),
                record(TagId::CtrlHeader, 0, 1, unlisted),
            ],
            Version::default(),
        )
        .unwrap();
        assert_eq!(models[0].model_type, ModelType::FieldHyperLink);
        assert_eq!(models[0].content.get_str("command"), Some("a:b"));
        assert_eq!(models[0].content.get_u32("id"), Some(7));
        assert_eq!(models[1].model_type, ModelType::Field);
    }

    #[test]
    fn test_unknown_tag_keeps_payload() {
        let records = vec![Record {
            tag_id: 0x3FE,
            level: 0,
            seqno: 0,
            offset: 0,
            payload: Bytes::from_static(&[1, 2, 3]),
        }];
        let models = resolve_all(records, Version::default()).unwrap();
        assert_eq!(models[0].model_type, ModelType::Unknown);
        assert!(models[0].content.is_empty());
        assert_eq!(models[0].unparsed.as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn test_version_gated_paragraph_field() {
        let payload = vec![0u8; 24];
        let old = resolve_all(
            vec![record(TagId::ParaHeader, 0, 0, payload.clone())],
            Version::new(5, 0, 3, 0),
        )
        .unwrap();
        assert!(!old[0].content.contains("change_tracking_merge"));
        assert_eq!(old[0].unparsed.as_ref().map(|b| b.len()), Some(2));

        let new = resolve_all(
            vec![record(TagId::ParaHeader, 0, 0, payload)],
            Version::new(5, 0, 3, 2),
        )
        .unwrap();
        assert!(new[0].content.contains("change_tracking_merge"));
        assert!(new[0].unparsed.is_none());
    }

    #[test]
    fn test_parse_error_carries_location() {
        let records = vec![
            record(TagId::CtrlHeader, 0, 0, control_payload(chid::TBL, COMMON_CONTROL_LEN)),
            record(TagId::Table, 1, 1, table_body_payload(&[1])),
            record(TagId::ListHeader, 1, 2, vec![0; 10]),
        ];
        let results: Vec<_> = resolve_models(
            records.into_iter().map(Ok),
            ParseContext::new(Version::default(), "BodyText/Section0"),
        )
        .collect();

        assert_eq!(results.len(), 3);
        let Err(Error::Parse(err)) = &results[2] else {
            panic!("expected a parse error, got {:?}", results[2]);
        };
        assert_eq!(err.type_name, "TableCell");
        assert_eq!(err.field, "row");
        assert_eq!(err.offset, 10);
        assert_eq!(err.seqno, 2);
        assert_eq!(err.path, "TableControl#0");
        assert_eq!(
            err.kind,
            FieldDecodeError::Truncated {
                needed: 2,
                available: 0
            }
        );
    }

    #[test]
    fn test_stops_after_structure_error() {
        let records = vec![
            record(TagId::ParaHeader, 0, 0, vec![0; 24]),
            record(TagId::ParaText, 2, 1, vec![]),
            record(TagId::ParaHeader, 0, 2, vec![0; 24]),
        ];
        let results: Vec<_> = resolve_models(
            records.into_iter().map(Ok),
            ParseContext::new(Version::default(), "s"),
        )
        .collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[1], Err(Error::Structure { .. })));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let build = || {
            vec![
                record(TagId::CtrlHeader, 0, 0, control_payload(chid::TBL, COMMON_CONTROL_LEN)),
                record(TagId::ListHeader, 1, 1, vec![0; TABLE_CAPTION_LEN]),
                record(TagId::Table, 1, 2, table_body_payload(&[1, 1])),
                record(TagId::ListHeader, 1, 3, vec![0; TABLE_CELL_LEN]),
            ]
        };
        let first = resolve_all(build(), Version::default()).unwrap();
        let second = resolve_all(build(), Version::default()).unwrap();
        assert_eq!(first, second);
    }
}
