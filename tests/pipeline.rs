//! End-to-end decoding of a compound file written to disk.

use bytes::BytesMut;
use cfb::CompoundFile;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use hwpv5::hwp5::{encode_record, flags, TagId};
use hwpv5::model::Node;
use hwpv5::{Error, ModelType, ParseOptions, TreeEvent};
use std::io::{Cursor, Write};

fn units(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn chid(id: &[u8; 4]) -> Vec<u8> {
    id.iter().rev().copied().collect()
}

fn extended(code: u16, id: &[u8; 4]) -> Vec<u8> {
    let mut out = code.to_le_bytes().to_vec();
    out.extend(chid(id));
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&code.to_le_bytes());
    out
}

fn para_header() -> Vec<u8> {
    vec![0u8; 24]
}

fn face_name(name: &str) -> Vec<u8> {
    let mut data = vec![0];
    data.extend_from_slice(&(name.encode_utf16().count() as u16).to_le_bytes());
    data.extend(units(name));
    data
}

fn stream(records: &[(TagId, u16, Vec<u8>)]) -> Vec<u8> {
    let mut out = BytesMut::new();
    for (tag, level, payload) in records {
        encode_record(*tag as u16, *level, payload, &mut out).unwrap();
    }
    out.to_vec()
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn docinfo() -> Vec<u8> {
    let mut id_mappings = vec![0u8; 72];
    id_mappings[4..8].copy_from_slice(&2u32.to_le_bytes());
    stream(&[
        (TagId::DocumentProperties, 0, vec![0; 26]),
        (TagId::IdMappings, 0, id_mappings),
        (TagId::FaceName, 1, face_name("함초롬바탕")),
        (TagId::FaceName, 1, face_name("함초롬바탕")),
    ])
}

fn section() -> Vec<u8> {
    let mut text = units("표: ");
    text.extend(extended(0x0B, b"tbl "));
    text.extend(units("\r"));

    let mut table = vec![0u8; 4];
    table.extend_from_slice(&1u16.to_le_bytes());
    table.extend_from_slice(&2u16.to_le_bytes());
    table.extend_from_slice(&[0u8; 10]);
    table.extend_from_slice(&2u16.to_le_bytes());
    table.extend_from_slice(&[0u8; 4]);

    let mut cell = vec![0u8; 38];
    cell[0] = 1;

    let mut control = chid(b"tbl ");
    control.resize(36, 0);

    stream(&[
        (TagId::ParaHeader, 0, para_header()),
        (TagId::ParaText, 1, text),
        (TagId::CtrlHeader, 1, control),
        (TagId::Table, 2, table),
        (TagId::ListHeader, 2, cell.clone()),
        (TagId::ParaHeader, 2, para_header()),
        (TagId::ParaText, 3, units("가\r")),
        (TagId::ListHeader, 2, cell),
        (TagId::ParaHeader, 2, para_header()),
        (TagId::ParaText, 3, units("나\r")),
    ])
}

fn write_document(properties: u32, section: Vec<u8>) -> tempfile::NamedTempFile {
    let mut header = vec![0u8; 256];
    header[..17].copy_from_slice(b"HWP Document File");
    header[32..36].copy_from_slice(&[0, 1, 1, 5]);
    header[36..40].copy_from_slice(&properties.to_le_bytes());

    let mut cfb = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    cfb.create_stream("/FileHeader")
        .unwrap()
        .write_all(&header)
        .unwrap();
    cfb.create_stream("/DocInfo")
        .unwrap()
        .write_all(&deflate(&docinfo()))
        .unwrap();
    cfb.create_storage("/BodyText").unwrap();
    cfb.create_stream("/BodyText/Section0")
        .unwrap()
        .write_all(&section)
        .unwrap();
    cfb.flush().unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&cfb.into_inner().into_inner()).unwrap();
    file.flush().unwrap();
    file
}

fn texts(events: &[TreeEvent<Node>]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            TreeEvent::Start(Node::Text(run)) => Some(run.text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_open_compressed_document() {
    let document = write_document(flags::COMPRESSED, deflate(&section()));
    let file = hwpv5::open(document.path()).unwrap();
    assert!(file.header().is_compressed());
    assert_eq!(file.section_names().unwrap(), vec!["BodyText/Section0"]);

    let events: Vec<_> = file
        .section_events(0)
        .unwrap()
        .collect::<hwpv5::Result<_>>()
        .unwrap();
    assert_eq!(texts(&events), vec!["표: ", "가", "나"]);

    let rows = events
        .iter()
        .filter(|e| matches!(e, TreeEvent::Start(Node::TableRow(_))))
        .count();
    assert_eq!(rows, 1);

    let cells = events
        .iter()
        .filter(|e| matches!(e, TreeEvent::Start(n) if n.is_model(ModelType::TableCell)))
        .count();
    assert_eq!(cells, 2);

    let faces = file
        .docinfo_events()
        .unwrap()
        .filter(|e| matches!(e, Ok(TreeEvent::Start(n)) if n.is_model(ModelType::FaceName)))
        .count();
    assert_eq!(faces, 1);
}

#[test]
fn test_raw_options_keep_records() {
    let document = write_document(flags::COMPRESSED, deflate(&section()));
    let file = hwpv5::open_with_options(document.path(), ParseOptions::new().raw()).unwrap();

    let models: Vec<_> = file
        .section_models(0)
        .unwrap()
        .collect::<hwpv5::Result<_>>()
        .unwrap();
    let types: Vec<_> = models.iter().map(|m| m.model_type).collect();
    assert_eq!(
        types,
        vec![
            ModelType::Paragraph,
            ModelType::ParaText,
            ModelType::TableControl,
            ModelType::TableBody,
            ModelType::TableCell,
            ModelType::Paragraph,
            ModelType::ParaText,
            ModelType::TableCell,
            ModelType::Paragraph,
            ModelType::ParaText,
        ]
    );
    let seqnos: Vec<_> = models.iter().map(|m| m.seqno).collect();
    assert_eq!(seqnos, (0..10).collect::<Vec<_>>());

    let faces = file
        .docinfo_events()
        .unwrap()
        .filter(|e| matches!(e, Ok(TreeEvent::Start(n)) if n.is_model(ModelType::FaceName)))
        .count();
    assert_eq!(faces, 2);

    let json = serde_json::to_value(&*models[4]).unwrap();
    assert_eq!(json["type"], "TableCell");
    assert_eq!(json["content"]["paragraphs"], 1);
}

#[test]
fn test_lenient_document_with_corrupt_section() {
    let document = write_document(flags::COMPRESSED, vec![0xFF; 16]);

    let strict = hwpv5::open(document.path()).unwrap();
    assert!(matches!(
        strict.all_events(),
        Err(Error::Decompression(_))
    ));

    let lenient = hwpv5::open_with_options(document.path(), ParseOptions::new().lenient()).unwrap();
    let streams = lenient.all_events().unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].stream, "DocInfo");
}
