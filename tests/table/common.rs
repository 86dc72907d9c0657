//! Shared test utilities for the table suite.

#![allow(dead_code)]

use std::sync::{Arc, Once};

pub use doctable::{
    FieldDescriptor, IndexField, IndexOpts, Key, MessageType, MessageWriter, Projector, Rect,
    ScalarKind, SchemaRegistry, Table, TableState, Timestamp,
};

static INIT_TRACING: Once = Once::new();

/// Route library logs to the test writer (visible with `--nocapture`)
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// JSON person document
pub fn person(first: &str, last: &str, age: i64) -> Vec<u8> {
    serde_json::json!({
        "name": { "first": first, "last": last },
        "age": age,
    })
    .to_string()
    .into_bytes()
}

/// Primary keys visited by an ascending scan over `index`
pub fn ascend_keys(table: &Table, index: &str) -> Vec<Key> {
    table.view(|tx| {
        let mut out = Vec::new();
        tx.ascend(index, |k, _| {
            out.push(k.clone());
            true
        })
        .unwrap();
        out
    })
}

/// Collect primary keys from any scan closure
pub fn collect(scan: impl FnOnce(&mut dyn FnMut(&Key, &[u8]) -> bool)) -> Vec<Key> {
    let mut out = Vec::new();
    scan(&mut |k: &Key, _: &[u8]| {
        out.push(k.clone());
        true
    });
    out
}

/// `Person { int32 age = 1; string name = 3; Address address = 4; }`
/// `Address { string zip = 2; }`
pub fn person_schema() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new()
            .with(MessageType::new(
                "Person",
                [
                    FieldDescriptor::new(1, "age", ScalarKind::Int32),
                    FieldDescriptor::new(3, "name", ScalarKind::String),
                    FieldDescriptor::message(4, "address", "Address"),
                ],
            ))
            .with(MessageType::new(
                "Address",
                [FieldDescriptor::new(2, "zip", ScalarKind::String)],
            )),
    )
}

/// Encoded `Person`
pub fn person_proto(age: i64, name: &str, zip: &str) -> Vec<u8> {
    MessageWriter::new()
        .int(1, age)
        .string(3, name)
        .message(4, MessageWriter::new().string(2, zip))
        .finish()
}

pub fn pk(s: &str) -> Key {
    Key::string(s)
}
