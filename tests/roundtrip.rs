//! Write-then-read round trips over full documents.

use rand::Rng;

use resarc::io::{ContainerReader, ReadArchive, Resource, WriteArchive};
use resarc::registry::FormatRegistry;
use resarc::span::ByteSpan;
use resarc::structs::{DataBlock, Document, Entry, Folder};

fn encode(doc: &Document) -> Vec<u8> {
    let mut buffer = Vec::new();
    buffer.write_archive(doc).unwrap();
    buffer
}

#[test]
fn nested_document_round_trip() {
    let mut models = Folder::new();
    models.insert("courseModel", Entry::Data(DataBlock::new(vec![1, 2, 3])));
    models.insert("skybox", Entry::Data(DataBlock::new(vec![4, 5])));

    let mut textures = Folder::new();
    textures.insert("grass", Entry::Data(DataBlock::new(vec![0xAA; 64])));
    textures.insert("empty", Entry::Data(DataBlock::new(Vec::new())));

    let mut doc = Document::new(*b"SCNE", 1);
    doc.root.insert("3DModels", Entry::Folder(models));
    doc.root.insert("Textures", Entry::Folder(textures));
    doc.root.insert("readme", Entry::Data(DataBlock::new(b"v1".to_vec())));

    let buffer = encode(&doc);
    let loaded = buffer.as_slice().read_archive().unwrap();
    assert_eq!(doc, loaded);
}

#[test]
fn empty_document_round_trip() {
    let doc = Document::new(*b"RLIB", 1);
    let loaded = encode(&doc).as_slice().read_archive().unwrap();
    assert_eq!(doc, loaded);
}

#[test]
fn writing_is_deterministic() {
    let mut doc = Document::new(*b"SCNE", 1);
    for i in 0..20u8 {
        doc.root.insert(
            format!("entry{i:02}"),
            Entry::Data(DataBlock::new(vec![i; (i as usize % 7) + 1])),
        );
    }
    assert_eq!(encode(&doc), encode(&doc));
}

#[test]
fn repeated_payloads_are_stored_once() {
    let shared = b"repeated vertex descriptor".to_vec();
    let mut doc = Document::new(*b"SCNE", 1);
    doc.root.insert("a", Entry::Data(DataBlock::new(shared.clone())));
    doc.root.insert("b", Entry::Data(DataBlock::new(shared.clone())));
    doc.root.insert("c", Entry::Data(DataBlock::new(shared.clone())));

    let buffer = encode(&doc);
    let count = buffer
        .windows(shared.len())
        .filter(|w| *w == shared.as_slice())
        .count();
    assert_eq!(count, 1);

    // dedup must be invisible to the reader
    let loaded = buffer.as_slice().read_archive().unwrap();
    assert_eq!(doc, loaded);
}

#[test]
fn shared_names_across_folders_are_stored_once() {
    let mut a = Folder::new();
    a.insert("commonName", Entry::Data(DataBlock::new(vec![1])));
    let mut b = Folder::new();
    b.insert("commonName", Entry::Data(DataBlock::new(vec![2])));

    let mut doc = Document::new(*b"SCNE", 1);
    doc.root.insert("left", Entry::Folder(a));
    doc.root.insert("right", Entry::Folder(b));

    let buffer = encode(&doc);
    let needle = b"commonName\0";
    let count = buffer.windows(needle.len()).filter(|w| w == needle).count();
    assert_eq!(count, 1);

    let loaded = buffer.as_slice().read_archive().unwrap();
    assert_eq!(doc, loaded);
}

#[test]
fn random_payloads_round_trip() {
    let mut rng = rand::rng();

    for _ in 0..20 {
        let mut doc = Document::new(*b"SCNE", 1);
        let entries = rng.random_range(1..8);
        for i in 0..entries {
            let len = rng.random_range(1..200);
            let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            doc.root.insert(format!("blob{i}"), Entry::Data(DataBlock::new(bytes)));
        }
        let loaded = encode(&doc).as_slice().read_archive().unwrap();
        assert_eq!(doc, loaded);
    }
}

#[test]
fn resolved_graph_views_match_written_payloads() {
    let payload = vec![0xDE, 0xAD, 0xBE, 0xEF];
    let mut doc = Document::new(*b"SCNE", 1);
    doc.root.insert("raw", Entry::Data(DataBlock::new(payload.clone())));

    let buffer = encode(&doc);
    let reader = ContainerReader::new(&buffer);
    let (header, root) = reader.read().unwrap();
    assert_eq!(header.fourcc, *b"SCNE");
    assert_eq!(header.size as usize, buffer.len());

    let Resource::Folder(entries) = root else {
        panic!("root must be a dictionary");
    };
    match entries.get(&"raw".to_string()) {
        Some(Resource::Data(span)) => assert_eq!(span.as_bytes(), payload.as_slice()),
        other => panic!("unexpected entry: {other:?}"),
    }
}

#[test]
fn auto_detection_tries_candidates_in_order() {
    let registry = FormatRegistry::with_builtin();

    // a bad candidate buffer must not abort the loop
    let candidates: Vec<Vec<u8>> = vec![
        vec![0u8; 10],
        encode(&Document::new(*b"RLIB", 1)),
    ];

    let mut detected = None;
    for buffer in &candidates {
        if let Ok(desc) = registry.detect(buffer) {
            detected = Some(desc.name);
            break;
        }
    }
    assert_eq!(detected, Some("resource library"));
}

#[test]
fn truncation_anywhere_never_panics() {
    let mut doc = Document::new(*b"SCNE", 1);
    let mut sub = Folder::new();
    sub.insert("x", Entry::Data(DataBlock::new(vec![9; 10])));
    doc.root.insert("sub", Entry::Folder(sub));
    let buffer = encode(&doc);

    for cut in 0..buffer.len() {
        // must return, Ok or Err, for every prefix
        let _ = ContainerReader::new(&buffer[..cut]).read();
        let _ = ByteSpan::new(&buffer[..cut]).read_string_pointer(16, 0);
    }
}
