//! HWP 5.0 binary format decoder.
//!
//! Streams of an HWP 5.0 document are flat sequences of tag/level/size
//! records. Decoding runs as a chain of lazy iterators: records are read,
//! resolved into typed models against their ancestors, turned into tree
//! events and finally post-processed into shaped paragraphs.

mod bodytext;
mod container;
pub mod control;
mod distdoc;
mod docinfo;
mod fields;
mod header;
mod models;
mod paragraph;
mod record;
mod registry;
mod resolver;
pub mod schema;
mod shape;
mod table;
mod tree;
mod views;

#[cfg(test)]
mod testutil;

pub use bodytext::{adopt_list_paragraphs, section_events, AdoptListParagraphs};
pub use container::{decompress_stream, Hwp5Container, MemorySource, StreamSource};
pub use distdoc::{
    decode_head_to_key, decode_head_to_sha1, DistributionStream, StreamDecryptor,
    CIPHERTEXT_OFFSET, SHA1_TEXT_SIZE,
};
pub use docinfo::{dedup_face_names, docinfo_events, DedupFaceNames};
pub use fields::{match_fields, MatchFields};
pub use header::{flags, FileHeader, Version};
pub use models::{bindata_kind, ModelType, DISTRIBUTE_DOC_DATA_SIZE, FACE_NAME_GROUPS};
pub use paragraph::{shape_paragraphs, ShapeParagraphs};
pub use record::{encode_record, Record, RecordHeader, RecordReader, TagId};
pub use registry::{registry, ExtensionKey, ExtensionRule, TypeRegistry};
pub use resolver::{resolve_models, Frame, ModelIter, ModelResolver, ParseContext};
pub use shape::{
    line_segmented, make_ranged_shapes, split_and_shape, Line, LineSegmented, RangedShape,
    SplitChunk, SplitShaped,
};
pub use table::{restructure_tables, RestructureTables};
pub use tree::{
    level_to_events, prefix_ancestors, AncestorStack, Ancestors, EventIter, TreeEvent, TreeNode,
};
pub use views::{text_chunks, CharShapePos, LineSegView, ListHeaderView, TableBodyView};

use crate::error::{Error, Result};
use crate::model::{Model, Node};
use crate::parse_options::ParseOptions;
use bytes::Bytes;
use log::{debug, warn};
use std::io::{Read, Seek};
use std::path::Path;
use std::rc::Rc;

/// Boxed stream of tree events.
pub type EventStream = Box<dyn Iterator<Item = Result<TreeEvent<Node>>>>;

/// Boxed stream of resolved models.
pub type ModelStream = Box<dyn Iterator<Item = Result<Rc<Model>>>>;

/// The decoded events of one stream.
#[derive(Debug, Clone)]
pub struct StreamEvents {
    /// Stream path, e.g. `BodyText/Section0`.
    pub stream: String,
    pub events: Vec<TreeEvent<Node>>,
}

/// An HWP 5.0 document opened over a stream source.
pub struct Hwp5File<S = Hwp5Container> {
    source: S,
    header: FileHeader,
    options: ParseOptions,
    decryptor: Option<Box<dyn StreamDecryptor>>,
}

impl Hwp5File<Hwp5Container> {
    /// Opens an HWP 5.0 document from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Hwp5Container::open(path)?)
    }

    /// Opens an HWP 5.0 document from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::new(Hwp5Container::from_reader(reader)?)
    }

    /// Opens an HWP 5.0 document from bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::new(Hwp5Container::from_bytes(data)?)
    }
}

impl<S: StreamSource> Hwp5File<S> {
    /// Reads the file header of `source`.
    ///
    /// Password protected documents are rejected here; distribution
    /// documents open but need a decryptor before their sections decode.
    pub fn new(source: S) -> Result<Self> {
        let header = FileHeader::parse(&source.read_stream("FileHeader")?)?;
        if header.is_encrypted() {
            return Err(Error::Encrypted);
        }
        debug!(
            "opened HWP {} document (flags {:#x})",
            header.version, header.properties
        );
        Ok(Self {
            source,
            header,
            options: ParseOptions::default(),
            decryptor: None,
        })
    }

    /// Replaces the parse options.
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs the cipher used for distribution document sections.
    pub fn with_decryptor(mut self, decryptor: impl StreamDecryptor + 'static) -> Self {
        self.decryptor = Some(Box::new(decryptor));
        self
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Reads a record stream, decrypting and decompressing as the header
    /// flags require.
    pub fn stream_data(&self, path: &str) -> Result<Bytes> {
        let raw = self.source.read_stream(path)?;
        let data = if self.header.is_distribution() && path.starts_with("ViewText/") {
            let decryptor = self
                .decryptor
                .as_deref()
                .ok_or(Error::DistributionRestricted)?;
            DistributionStream::parse(Bytes::from(raw))?.decrypt(decryptor)?
        } else {
            raw
        };

        if self.header.is_compressed() {
            Ok(Bytes::from(decompress_stream(&data)?))
        } else {
            Ok(Bytes::from(data))
        }
    }

    /// Reads the raw records of a stream.
    pub fn records(&self, path: &str) -> Result<RecordReader<bytes::buf::Reader<Bytes>>> {
        Ok(RecordReader::from_bytes(self.stream_data(path)?))
    }

    /// Resolves the records of a stream into models.
    pub fn models(&self, path: &str) -> Result<ModelStream> {
        let records = self.records(path)?;
        let root = ParseContext::new(self.header.version, path);
        Ok(Box::new(resolve_models(records, root)))
    }

    pub fn docinfo_models(&self) -> Result<ModelStream> {
        self.models("DocInfo")
    }

    /// DocInfo as tree events.
    pub fn docinfo_events(&self) -> Result<EventStream> {
        Ok(docinfo_events(
            self.docinfo_models()?,
            self.options.dedup_face_names,
        ))
    }

    /// Paths of the body section streams, in section order.
    pub fn section_names(&self) -> Result<Vec<String>> {
        let storage = self.header.body_storage();
        let mut sections: Vec<(u32, String)> = self
            .source
            .list_streams(storage)?
            .into_iter()
            .filter_map(|name| {
                let index = name.strip_prefix("Section")?.parse().ok()?;
                Some((index, format!("{storage}/{name}")))
            })
            .collect();
        if sections.is_empty() {
            return Err(Error::MissingComponent(storage.to_string()));
        }
        sections.sort();
        Ok(sections.into_iter().map(|(_, path)| path).collect())
    }

    fn section_path(&self, index: usize) -> Result<String> {
        self.section_names()?
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::MissingComponent(format!("section {index}")))
    }

    pub fn section_models(&self, index: usize) -> Result<ModelStream> {
        self.models(&self.section_path(index)?)
    }

    /// Events of one body section, shaped per the configured tree mode.
    pub fn section_events(&self, index: usize) -> Result<EventStream> {
        Ok(section_events(
            self.section_models(index)?,
            self.options.tree_mode,
        ))
    }

    /// Decodes DocInfo and every section.
    ///
    /// In lenient mode a stream that fails anywhere is logged and left out;
    /// in strict mode the first failure is returned.
    pub fn all_events(&self) -> Result<Vec<StreamEvents>> {
        let mut streams = vec![String::from("DocInfo")];
        streams.extend(self.section_names()?);

        let mut decoded = Vec::with_capacity(streams.len());
        for stream in streams {
            let events = match stream.as_str() {
                "DocInfo" => self.docinfo_events(),
                path => self
                    .models(path)
                    .map(|models| section_events(models, self.options.tree_mode)),
            }
            .and_then(|events| events.collect::<Result<Vec<_>>>());

            match events {
                Ok(events) => decoded.push(StreamEvents { stream, events }),
                Err(e) if self.options.is_lenient() => {
                    warn!("skipping stream {}: {}", stream, e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(decoded)
    }

    /// Text of the preview stream, if present.
    pub fn preview_text(&self) -> Result<String> {
        container::decode_utf16le(&self.source.read_stream("PrvText")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwp5::control::chid;
    use crate::hwp5::testutil::*;
    use bytes::BytesMut;
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn file_header(properties: u32) -> Vec<u8> {
        let mut data = vec![0u8; 256];
        data[..17].copy_from_slice(b"HWP Document File");
        data[32..36].copy_from_slice(&[0, 1, 1, 5]);
        data[36..40].copy_from_slice(&properties.to_le_bytes());
        data
    }

    fn stream(records: Vec<(TagId, u16, Vec<u8>)>) -> Vec<u8> {
        let mut out = BytesMut::new();
        for (tag, level, payload) in records {
            encode_record(tag as u16, level, &payload, &mut out).unwrap();
        }
        out.to_vec()
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn section() -> Vec<u8> {
        stream(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, units("hello\r")),
        ])
    }

    fn source(properties: u32, body: &str, section_data: Vec<u8>) -> MemorySource {
        let mut source = MemorySource::new();
        source
            .insert("FileHeader", file_header(properties))
            .insert("DocInfo", stream(vec![(TagId::DocumentProperties, 0, vec![0; 26])]))
            .insert(format!("{body}/Section1"), section_data.clone())
            .insert(format!("{body}/Section0"), section_data)
            .insert("PrvText", units("preview"));
        source
    }

    #[test]
    fn test_uncompressed_sections() {
        let file = Hwp5File::new(source(0, "BodyText", section())).unwrap();
        assert_eq!(file.header().version, Version::new(5, 1, 1, 0));
        assert_eq!(
            file.section_names().unwrap(),
            vec!["BodyText/Section0", "BodyText/Section1"]
        );

        let events: Vec<_> = file
            .section_events(1)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            render(&events),
            "<Paragraph><LineSeg>'hello'<PARAGRAPH_BREAK/></LineSeg></Paragraph>"
        );
        assert_eq!(file.preview_text().unwrap(), "preview");
        assert!(matches!(
            file.section_models(2),
            Err(Error::MissingComponent(_))
        ));
    }

    #[test]
    fn test_compressed_streams() {
        let mut source = MemorySource::new();
        source
            .insert("FileHeader", file_header(flags::COMPRESSED))
            .insert("DocInfo", deflate(&stream(vec![(TagId::DocumentProperties, 0, vec![0; 26])])))
            .insert("BodyText/Section0", deflate(&section()));
        let file = Hwp5File::new(source).unwrap();

        let docinfo: Vec<_> = file.docinfo_models().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(docinfo.len(), 1);
        assert_eq!(docinfo[0].model_type, ModelType::DocumentProperties);

        let streams = file.all_events().unwrap();
        let names: Vec<_> = streams.iter().map(|s| s.stream.as_str()).collect();
        assert_eq!(names, vec!["DocInfo", "BodyText/Section0"]);
    }

    #[test]
    fn test_password_documents_rejected() {
        let result = Hwp5File::new(source(flags::PASSWORD, "BodyText", section()));
        assert!(matches!(result, Err(Error::Encrypted)));
    }

    #[test]
    fn test_distribution_sections() {
        let mut sha1 = [b'0'; SHA1_TEXT_SIZE];
        sha1[..16].copy_from_slice(b"0123456789abcdef");
        let mut data = BytesMut::new();
        encode_record(
            TagId::DistributeDocData as u16,
            0,
            &distdoc::scrambled_head(0x5eed, &sha1),
            &mut data,
        )
        .unwrap();
        // stand-in cipher: XOR with the first key byte
        let key0 = b'0';
        data.extend(section().iter().map(|b| b ^ key0));

        let file = Hwp5File::new(source(flags::DISTRIBUTABLE, "ViewText", data.to_vec())).unwrap();
        assert_eq!(file.section_names().unwrap()[0], "ViewText/Section0");
        assert!(matches!(
            file.section_events(0),
            Err(Error::DistributionRestricted)
        ));

        let file = file.with_decryptor(|key: &[u8; 16], ciphertext: &[u8]| -> Result<Vec<u8>> {
            Ok(ciphertext.iter().map(|b| b ^ key[0]).collect())
        });
        let models: Vec<_> = file.section_models(0).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(models[0].model_type, ModelType::Paragraph);
        assert_eq!(models[1].model_type, ModelType::ParaText);
    }

    #[test]
    fn test_lenient_skips_broken_sections() {
        let mut broken = section();
        broken.truncate(broken.len() - 3);
        let file = Hwp5File::new(source(0, "BodyText", broken)).unwrap();

        assert!(matches!(
            file.all_events(),
            Err(Error::TruncatedStream { .. })
        ));

        let file = file.with_options(ParseOptions::new().lenient());
        let streams = file.all_events().unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].stream, "DocInfo");
    }

    #[test]
    fn test_raw_tree_mode() {
        let mut text = extended(control::code::DRAWING_TABLE_OBJECT, chid::TBL);
        text.extend(units("\r"));
        let data = stream(vec![
            (TagId::ParaHeader, 0, para_header(0, 0)),
            (TagId::ParaText, 1, text),
            (TagId::CtrlHeader, 1, control_payload(chid::TBL, COMMON_CONTROL_LEN)),
        ]);
        let file = Hwp5File::new(source(0, "BodyText", data))
            .unwrap()
            .with_options(ParseOptions::new().raw());
        let events: Vec<_> = file
            .section_events(0)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            render(&events),
            "<Paragraph><ParaText/><TableControl/></Paragraph>"
        );
    }
}
