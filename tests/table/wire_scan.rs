//! Protobuf field extraction through the public scanner

use crate::common::*;
use doctable::{Error, WireError, WireScanner};

#[test]
fn test_batch_scan_in_order_and_reversed() {
    let schema = person_schema();
    let scanner = WireScanner::new(&*schema, "Person");
    let buf = MessageWriter::new().int(1, 38).string(3, "Tom").finish();

    let expected = vec![Some(Key::Int(38)), Some(Key::string("Tom"))];
    assert_eq!(scanner.keys_of(&buf, &[&[1], &[3]]).unwrap(), expected);

    // Descending request order goes through per-field scans
    let reversed = scanner.keys_of(&buf, &[&[3], &[1]]).unwrap();
    assert_eq!(reversed, vec![Some(Key::string("Tom")), Some(Key::Int(38))]);
}

#[test]
fn test_out_of_order_buffer_degrades() {
    init_tracing();
    let schema = person_schema();
    let scanner = WireScanner::new(&*schema, "Person");
    let buf = MessageWriter::new()
        .string(3, "Tom")
        .message(4, MessageWriter::new().string(2, "02139"))
        .int(1, 38)
        .finish();

    let keys = scanner.keys_of(&buf, &[&[1], &[3], &[4, 2]]).unwrap();
    assert_eq!(
        keys,
        vec![
            Some(Key::Int(38)),
            Some(Key::string("Tom")),
            Some(Key::string("02139"))
        ]
    );
    for (i, path) in [&[1u32][..], &[3], &[4, 2]].iter().enumerate() {
        assert_eq!(scanner.get(&buf, path).unwrap(), keys[i]);
    }
}

#[test]
fn test_absent_field_is_none() {
    let schema = person_schema();
    let scanner = WireScanner::new(&*schema, "Person");
    let buf = MessageWriter::new().int(1, 38).finish();
    assert_eq!(
        scanner.keys_of(&buf, &[&[1], &[3]]).unwrap(),
        vec![Some(Key::Int(38)), None]
    );
    assert_eq!(scanner.get(&buf, &[4, 2]).unwrap(), None);
}

#[test]
fn test_malformed_buffers_fail() {
    let schema = person_schema();
    let scanner = WireScanner::new(&*schema, "Person");

    // Group end marker
    let err = scanner.get(&[0x0C], &[1]).unwrap_err();
    assert_eq!(err, Error::MalformedWireData(WireError::GroupEnd { offset: 0 }));

    // Field number zero
    let err = scanner.get(&[0x00, 0x01], &[1]).unwrap_err();
    assert!(matches!(err, Error::MalformedWireData(WireError::IllegalFieldNumber { number: 0 })));

    // Declared length runs past the end
    let mut buf = MessageWriter::new().string(3, "Tom").finish();
    buf.pop();
    assert!(matches!(
        scanner.keys_of(&buf, &[&[1], &[3]]).unwrap_err(),
        Error::MalformedWireData(WireError::Truncated { .. })
    ));
}

#[test]
fn test_protobuf_index_scan() {
    let schema = person_schema();
    let table = Table::new();
    let field = IndexField::protobuf(schema, "Person", vec![1], IndexOpts::int(false)).unwrap();
    table.create_index("age", "person:*", Projector::single(field)).unwrap();

    for (key, age) in [("person:1", 52), ("person:2", 38), ("person:3", 47)] {
        table.set(pk(key), person_proto(age, "x", "0"), None).unwrap();
    }
    let found = table.view(|tx| {
        collect(|v| tx.ascend_greater_or_equal("age", Key::Int(40), v).unwrap())
    });
    assert_eq!(found, vec![pk("person:3"), pk("person:1")]);
}
