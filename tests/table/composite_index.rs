//! Two-field indexes over JSON and Protobuf values

use crate::common::*;
use doctable::Error;

fn people_table() -> Table {
    init_tracing();
    let table = Table::new();
    let projector = Projector::composite(
        IndexField::json("age", IndexOpts::int(false)).unwrap(),
        IndexField::json(
            "name.last",
            IndexOpts::INCLUDE_STRING | IndexOpts::CASE_INSENSITIVE,
        )
        .unwrap(),
    );
    table.create_index("age_last", "*", projector).unwrap();
    for (key, first, last, age) in [
        ("p:8", "Sam", "Alpha", 38),
        ("p:7", "Jane", "beta", 38),
        ("p:6", "Jack", "Beta", 38),
        ("p:2", "Roger", "Prichard", 47),
        ("p:3", "Melinda", "Anderson", 52),
    ] {
        table.set(pk(key), person(first, last, age), None).unwrap();
    }
    table
}

#[test]
fn test_composite_pivot_with_case_insensitive_ties() {
    let table = people_table();
    let pivot = Key::composite(Key::Float(38.0), Key::string("b")).unwrap();
    let found = table.view(|tx| {
        collect(|v| tx.ascend_greater_or_equal("age_last", pivot, v).unwrap())
    });
    // "beta" and "Beta" tie, so primary-key order decides
    assert_eq!(found, vec![pk("p:6"), pk("p:7"), pk("p:2"), pk("p:3")]);
}

#[test]
fn test_composite_full_order() {
    let table = people_table();
    assert_eq!(
        ascend_keys(&table, "age_last"),
        vec![pk("p:8"), pk("p:6"), pk("p:7"), pk("p:2"), pk("p:3")]
    );
    let reversed = table.view(|tx| collect(|v| tx.descend("age_last", v).unwrap()));
    assert_eq!(
        reversed,
        vec![pk("p:3"), pk("p:2"), pk("p:7"), pk("p:6"), pk("p:8")]
    );
}

#[test]
fn test_scalar_pivot_bounds_first_field() {
    let table = people_table();
    let ge = table.view(|tx| {
        collect(|v| tx.ascend_greater_or_equal("age_last", Key::Int(47), v).unwrap())
    });
    assert_eq!(ge, vec![pk("p:2"), pk("p:3")]);

    let lt = table.view(|tx| {
        collect(|v| tx.ascend_less_than("age_last", Key::Int(47), v).unwrap())
    });
    assert_eq!(lt, vec![pk("p:8"), pk("p:6"), pk("p:7")]);

    let le = table.view(|tx| {
        collect(|v| tx.descend_less_or_equal("age_last", Key::Int(38), v).unwrap())
    });
    assert_eq!(le, vec![pk("p:7"), pk("p:6"), pk("p:8")]);

    let gt = table.view(|tx| {
        collect(|v| tx.descend_greater_than("age_last", Key::Int(38), v).unwrap())
    });
    assert_eq!(gt, vec![pk("p:3"), pk("p:2")]);

    let range = table.view(|tx| {
        collect(|v| {
            tx.ascend_range("age_last", Key::Int(38), Key::Int(52), v)
                .unwrap()
        })
    });
    assert_eq!(range, vec![pk("p:8"), pk("p:6"), pk("p:7"), pk("p:2")]);

    let range = table.view(|tx| {
        collect(|v| {
            tx.descend_range("age_last", Key::Int(52), Key::Int(38), v)
                .unwrap()
        })
    });
    assert_eq!(range, vec![pk("p:3"), pk("p:2")]);
}

#[test]
fn test_missing_component_skips_record() {
    let table = people_table();
    table
        .set(pk("p:9"), br#"{"age":38}"#.to_vec(), None)
        .unwrap();
    assert_eq!(table.view(|tx| tx.index_len("age_last")).unwrap(), 5);
    assert!(table.get(&pk("p:9")).is_ok());
}

#[test]
fn test_protobuf_composite_index() {
    init_tracing();
    let schema = person_schema();
    let table = Table::new();
    let projector = Projector::composite(
        IndexField::protobuf(schema.clone(), "Person", vec![1], IndexOpts::int(true)).unwrap(),
        IndexField::protobuf(schema, "Person", vec![4, 2], IndexOpts::string(false)).unwrap(),
    );
    table.create_index("age_zip", "*", projector).unwrap();
    table.set(pk("a"), person_proto(30, "Ann", "94107"), None).unwrap();
    table.set(pk("b"), person_proto(40, "Bob", "10001"), None).unwrap();
    table.set(pk("c"), person_proto(30, "Cid", "02139"), None).unwrap();

    // Age descending, then zip ascending
    assert_eq!(ascend_keys(&table, "age_zip"), vec![pk("b"), pk("c"), pk("a")]);
}

#[test]
fn test_malformed_protobuf_rejects_set() {
    let schema = person_schema();
    let table = Table::new();
    let field = IndexField::protobuf(schema, "Person", vec![3], IndexOpts::string(false)).unwrap();
    table.create_index("name", "*", Projector::single(field)).unwrap();
    table.set(pk("a"), person_proto(30, "Ann", "1"), None).unwrap();

    let mut truncated = person_proto(31, "Annabel", "1");
    truncated.truncate(6);
    let err = table.set(pk("a"), truncated, None).unwrap_err();
    assert!(matches!(err, Error::MalformedWireData(_)));

    // The failed write left the old record and its entry in place
    assert_eq!(table.get(&pk("a")).unwrap(), person_proto(30, "Ann", "1"));
    assert_eq!(table.view(|tx| tx.index_len("name")).unwrap(), 1);
}
