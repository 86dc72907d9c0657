//! Indexes stay in step with the primary tree across writes

use crate::common::*;
use doctable::Error;
use proptest::prelude::*;

fn age_table() -> Table {
    let table = Table::new();
    let field = IndexField::json("age", IndexOpts::int(false)).unwrap();
    table.create_index("age", "user:*", Projector::single(field)).unwrap();
    table
}

#[test]
fn test_replace_leaves_one_entry() {
    let table = age_table();
    table.set(pk("user:1"), person("a", "b", 20), None).unwrap();
    table.set(pk("user:1"), person("a", "b", 60), None).unwrap();

    assert_eq!(table.view(|tx| tx.index_len("age")).unwrap(), 1);
    let stale = table.view(|tx| {
        collect(|v| tx.ascend_range("age", Key::Int(20), Key::Int(21), v).unwrap())
    });
    assert!(stale.is_empty());
    let fresh = table.view(|tx| {
        collect(|v| tx.ascend_greater_or_equal("age", Key::Int(60), v).unwrap())
    });
    assert_eq!(fresh, vec![pk("user:1")]);
}

#[test]
fn test_pattern_scopes_membership() {
    let table = age_table();
    table.set(pk("user:1"), person("a", "b", 20), None).unwrap();
    table.set(pk("admin:1"), person("a", "b", 30), None).unwrap();
    table.set(Key::Int(7), person("a", "b", 40), None).unwrap();
    assert_eq!(ascend_keys(&table, "age"), vec![pk("user:1")]);
    assert_eq!(ascend_keys(&table, ""), vec![Key::Int(7), pk("admin:1"), pk("user:1")]);
}

#[test]
fn test_pattern_brackets_and_braces_are_literal() {
    let table = Table::new();
    let field = IndexField::json("age", IndexOpts::int(false)).unwrap();
    table.create_index("tagged", "tag:[a]{x,y}*", Projector::single(field)).unwrap();
    table.set(pk("tag:[a]{x,y}/1"), person("a", "b", 1), None).unwrap();
    table.set(pk("tag:ax1"), person("a", "b", 2), None).unwrap();
    table.set(pk("tag:[a]x1"), person("a", "b", 3), None).unwrap();
    assert_eq!(ascend_keys(&table, "tagged"), vec![pk("tag:[a]{x,y}/1")]);
    let pattern = table
        .view(|tx| tx.index("tagged").map(|i| i.pattern().to_string()))
        .unwrap();
    assert_eq!(pattern, "tag:[a]{x,y}*");
}

#[test]
fn test_delete_all_requires_recreating_indexes() {
    let table = age_table();
    table.set(pk("user:1"), person("a", "b", 20), None).unwrap();
    table.delete_all();
    assert!(table.is_empty());
    assert!(table.index_names().is_empty());
    let err = table.view(|tx| tx.ascend("age", |_, _| true)).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_rebuild_after_drop_and_recreate() {
    let table = age_table();
    for i in 0..20 {
        table
            .set(pk(&format!("user:{:02}", i)), person("a", "b", 50 - i), None)
            .unwrap();
    }
    table.drop_index("age").unwrap();
    let field = IndexField::json("age", IndexOpts::int(true)).unwrap();
    table.create_index("age", "user:*", Projector::single(field)).unwrap();
    let stats = table.rebuild_index("age").unwrap();
    assert_eq!(stats.entries, 20);

    // Descending option: oldest first
    let keys = ascend_keys(&table, "age");
    assert_eq!(keys.first(), Some(&pk("user:00")));
    assert_eq!(keys.last(), Some(&pk("user:19")));
}

#[test]
fn test_scan_early_stop() {
    let table = age_table();
    for i in 0..10 {
        table.set(pk(&format!("user:{}", i)), person("a", "b", i), None).unwrap();
    }
    let mut seen = 0;
    table
        .view(|tx| {
            tx.ascend("age", |_, _| {
                seen += 1;
                seen < 3
            })
        })
        .unwrap();
    assert_eq!(seen, 3);
}

#[test]
fn test_repeated_scans_are_identical() {
    let table = age_table();
    for i in 0..50 {
        table.set(pk(&format!("user:{}", i)), person("a", "b", i % 5), None).unwrap();
    }
    let first = ascend_keys(&table, "age");
    let second = ascend_keys(&table, "age");
    assert_eq!(first, second);
    assert_eq!(first.len(), 50);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// After any sequence of writes the index holds exactly one entry per
    /// live record, in (age, key) order.
    #[test]
    fn prop_index_matches_live_records(ops in prop::collection::vec((0u8..12, prop::option::of(0i64..10)), 1..60)) {
        let table = age_table();
        let mut model = std::collections::BTreeMap::new();
        for (slot, age) in ops {
            let key = format!("user:{:02}", slot);
            match age {
                Some(age) => {
                    table.set(pk(&key), person("a", "b", age), None).unwrap();
                    model.insert(key, age);
                }
                None => {
                    let _ = table.delete(&pk(&key));
                    model.remove(&key);
                }
            }
        }
        let mut expected: Vec<(i64, String)> = model.into_iter().map(|(k, a)| (a, k)).collect();
        expected.sort();
        let expected: Vec<Key> = expected.into_iter().map(|(_, k)| pk(&k)).collect();
        prop_assert_eq!(ascend_keys(&table, "age"), expected);
    }
}
